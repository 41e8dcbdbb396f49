//! Chat commands that manage subscriptions.
//!
//! `/start` registers the chat and immediately sends the current schedule,
//! `/queue <n>` narrows updates to one queue (`0` follows all of them) and
//! `/stop` unregisters. Every message gets a reply; reply failures are
//! logged and never fail the command.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::notifier::{DeliveryStatus, Notifier};
use super::ports::{
    CommandOutcome, IncomingMessage, MessageSink, ScheduleRepository, SubscriberRepository,
    SubscriberRepositoryError, SubscriptionCommand,
};
use super::store_errors::{map_schedule_error, map_subscriber_error};
use super::{Error, QueueNumber, SubscriberId, SubscriberRecord};

const START_COMMAND: &str = "/start";
const QUEUE_COMMAND: &str = "/queue";
const STOP_COMMAND: &str = "/stop";

mod replies {
    pub(super) const UNSUPPORTED: &str = "Дана команда/повідомлення не підтримується";
    pub(super) const ALREADY_SUBSCRIBED: &str = "Ви вже отримуєте оновлення графіка відключень";
    pub(super) const WELCOME: &str = "Тепер ви будете отримувати оновлення графіка відключень! \
        Щоб змінити номер черги, скористайтеся командою \"/queue <номер черги>\" \
        (наприклад \"/queue 3\"), щоб припинити отримувати оновлення, \
        скористайтеся командою /stop";
    pub(super) const NOT_SUBSCRIBED: &str =
        "Щоб почати отримувати оновлення, скористайтеся командою /start";
    pub(super) const FILTER_CHANGED: &str = "Чергу змінено!";
    pub(super) const UNSUBSCRIBED: &str =
        "Тепер ви не будете отримувати оновлення графіка відключень";

    pub(super) fn invalid_queue(queue_count: u32) -> String {
        format!(
            "Номер черги має бути числом від 0 до {queue_count} \
             (0 - щоб отримувати оновлення всіх черг)"
        )
    }
}

/// A parsed chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedCommand {
    /// Subscribe.
    Start,
    /// Replace the queue filter; `None` follows every queue.
    SetFilter(Option<QueueNumber>),
    /// Unsubscribe.
    Stop,
    /// `/queue` with a missing, non-numeric or out-of-range argument.
    InvalidQueue,
    /// Anything else.
    Unsupported,
}

/// Interpret a chat message.
///
/// Commands match by case-insensitive prefix, so `/START` and
/// `/start@my_bot` both subscribe.
///
/// # Examples
/// ```
/// use schedule_watch::domain::{ParsedCommand, QueueNumber, parse_command};
///
/// assert_eq!(parse_command("/queue 0", 6), ParsedCommand::SetFilter(None));
/// assert_eq!(
///     parse_command("/queue 3", 6),
///     ParsedCommand::SetFilter(Some(QueueNumber::new(3).expect("queue")))
/// );
/// assert_eq!(parse_command("/queue 7", 6), ParsedCommand::InvalidQueue);
/// assert_eq!(parse_command("hello", 6), ParsedCommand::Unsupported);
/// ```
pub fn parse_command(text: &str, queue_count: u32) -> ParsedCommand {
    let text = text.trim();
    if has_command_prefix(text, START_COMMAND) {
        ParsedCommand::Start
    } else if has_command_prefix(text, QUEUE_COMMAND) {
        parse_queue_argument(&text[QUEUE_COMMAND.len()..], queue_count)
    } else if has_command_prefix(text, STOP_COMMAND) {
        ParsedCommand::Stop
    } else {
        ParsedCommand::Unsupported
    }
}

fn has_command_prefix(text: &str, command: &str) -> bool {
    text.get(..command.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(command))
}

fn parse_queue_argument(rest: &str, queue_count: u32) -> ParsedCommand {
    let argument = rest.split_whitespace().next().unwrap_or_default();
    match argument.parse::<u32>() {
        Ok(0) => ParsedCommand::SetFilter(None),
        Ok(n) if n <= queue_count => QueueNumber::new(i64::from(n))
            .map_or(ParsedCommand::InvalidQueue, |queue| ParsedCommand::SetFilter(Some(queue))),
        _ => ParsedCommand::InvalidQueue,
    }
}

/// Domain service implementing [`SubscriptionCommand`].
#[derive(Clone)]
pub struct SubscriptionService {
    subscribers: Arc<dyn SubscriberRepository>,
    schedule: Arc<dyn ScheduleRepository>,
    sink: Arc<dyn MessageSink>,
    notifier: Notifier,
    queue_count: u32,
}

impl SubscriptionService {
    /// Create the service. `notifier` delivers the catch-up schedule after
    /// `/start`.
    pub fn new(
        subscribers: Arc<dyn SubscriberRepository>,
        schedule: Arc<dyn ScheduleRepository>,
        sink: Arc<dyn MessageSink>,
        notifier: Notifier,
        queue_count: u32,
    ) -> Self {
        Self {
            subscribers,
            schedule,
            sink,
            notifier,
            queue_count,
        }
    }

    async fn reply(&self, recipient: SubscriberId, text: &str) {
        if let Err(err) = self.sink.send(recipient, text).await {
            warn!(subscriber = %recipient, error = %err, "reply was not delivered");
        }
    }

    async fn start(&self, id: SubscriberId) -> Result<CommandOutcome, Error> {
        if self.find(id).await?.is_some() {
            self.reply(id, replies::ALREADY_SUBSCRIBED).await;
            return Ok(CommandOutcome::AlreadySubscribed);
        }

        let subscriber = SubscriberRecord::new(id);
        match self.subscribers.insert(&subscriber).await {
            Ok(()) => {}
            Err(SubscriberRepositoryError::Duplicate { .. }) => {
                self.reply(id, replies::ALREADY_SUBSCRIBED).await;
                return Ok(CommandOutcome::AlreadySubscribed);
            }
            Err(err) => return Err(map_subscriber_error(err)),
        }
        info!(subscriber = %id, "subscriber registered");
        self.reply(id, replies::WELCOME).await;

        let records = self.schedule.load_all().await.map_err(map_schedule_error)?;
        let outcome = self.notifier.notify_subscriber(&subscriber, &records).await;
        let catch_up_delivered = outcome.deliveries.iter().all(|delivery| {
            !matches!(delivery.status, DeliveryStatus::Failed { .. })
        }) && outcome.watermarks_committed;
        Ok(CommandOutcome::Subscribed { catch_up_delivered })
    }

    async fn set_filter(
        &self,
        id: SubscriberId,
        queue: Option<QueueNumber>,
    ) -> Result<CommandOutcome, Error> {
        let updated = self
            .subscribers
            .set_queue_filter(id, queue)
            .await
            .map_err(map_subscriber_error)?;
        if !updated {
            self.reply(id, replies::NOT_SUBSCRIBED).await;
            return Ok(CommandOutcome::NotSubscribed);
        }
        info!(subscriber = %id, queue = ?queue.map(QueueNumber::get), "queue filter changed");
        self.reply(id, replies::FILTER_CHANGED).await;
        Ok(CommandOutcome::FilterChanged { queue })
    }

    async fn stop(&self, id: SubscriberId) -> Result<CommandOutcome, Error> {
        let removed = self
            .subscribers
            .remove(id)
            .await
            .map_err(map_subscriber_error)?;
        if removed {
            info!(subscriber = %id, "subscriber removed");
        } else {
            warn!(subscriber = %id, "stop from unknown subscriber");
        }
        self.reply(id, replies::UNSUBSCRIBED).await;
        Ok(CommandOutcome::Unsubscribed)
    }

    async fn find(&self, id: SubscriberId) -> Result<Option<SubscriberRecord>, Error> {
        self.subscribers.find(id).await.map_err(map_subscriber_error)
    }
}

#[async_trait]
impl SubscriptionCommand for SubscriptionService {
    async fn handle_message(&self, message: IncomingMessage) -> Result<CommandOutcome, Error> {
        let sender = message.sender;
        match parse_command(&message.text, self.queue_count) {
            ParsedCommand::Start => self.start(sender).await,
            ParsedCommand::SetFilter(queue) => self.set_filter(sender, queue).await,
            ParsedCommand::Stop => self.stop(sender).await,
            ParsedCommand::InvalidQueue => {
                self.reply(sender, &replies::invalid_queue(self.queue_count))
                    .await;
                Ok(CommandOutcome::InvalidQueue)
            }
            ParsedCommand::Unsupported => {
                self.reply(sender, replies::UNSUPPORTED).await;
                Ok(CommandOutcome::Unsupported)
            }
        }
    }
}
