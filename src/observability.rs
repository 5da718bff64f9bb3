use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("aura.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("aura.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("aura.client.request_duration_seconds");
pub(crate) static CLIENT_UNAUTHORIZED: Counter = Counter::new("aura.client.unauthorized");

pub(crate) static AUTH_LOGINS: Counter = Counter::new("aura.auth.logins");
pub(crate) static AUTH_LOGOUTS: Counter = Counter::new("aura.auth.logouts");
pub(crate) static AUTH_PROBES: Counter = Counter::new("aura.auth.probes");
pub(crate) static AUTH_PROBES_JOINED: Counter = Counter::new("aura.auth.probes_joined");

pub(crate) static STORAGE_ERRORS: Counter = Counter::new("aura.storage.errors");

pub(crate) static CHAT_MESSAGES_SENT: Counter = Counter::new("aura.chat.messages_sent");
pub(crate) static CHAT_MESSAGES_QUEUED: Counter = Counter::new("aura.chat.messages_queued");
pub(crate) static CHAT_SEND_ERRORS: Counter = Counter::new("aura.chat.send_errors");
pub(crate) static CHAT_STALE_REPLIES: Counter = Counter::new("aura.chat.stale_replies");
pub(crate) static CHAT_ATTACHMENTS_REJECTED: Counter =
    Counter::new("aura.chat.attachments_rejected");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);
    collector.register_counter(&CLIENT_UNAUTHORIZED);

    collector.register_counter(&AUTH_LOGINS);
    collector.register_counter(&AUTH_LOGOUTS);
    collector.register_counter(&AUTH_PROBES);
    collector.register_counter(&AUTH_PROBES_JOINED);

    collector.register_counter(&STORAGE_ERRORS);

    collector.register_counter(&CHAT_MESSAGES_SENT);
    collector.register_counter(&CHAT_MESSAGES_QUEUED);
    collector.register_counter(&CHAT_SEND_ERRORS);
    collector.register_counter(&CHAT_STALE_REPLIES);
    collector.register_counter(&CHAT_ATTACHMENTS_REJECTED);
}
