//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly.

diesel::table! {
    /// Mirrored schedule entries.
    ///
    /// Keyed by `(queue_number, schedule_date)`; `updated_at` moves only
    /// when `disconnection_times` changes.
    queue_schedules (queue_number, schedule_date) {
        /// Positive queue number.
        queue_number -> Int4,
        /// Calendar date of the windows.
        schedule_date -> Date,
        /// Windows joined by the configured separator.
        disconnection_times -> Text,
        /// Time of the last content change.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Registered chats.
    subscribers (chat_id) {
        /// Messaging-platform chat identifier.
        chat_id -> Int8,
        /// Followed queue; NULL follows every queue.
        queue_filter -> Nullable<Int4>,
        /// Newest delivered `queue_schedules.updated_at`.
        last_received_update -> Nullable<Timestamptz>,
        /// Registration time.
        created_at -> Timestamptz,
    }
}
