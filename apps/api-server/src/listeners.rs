//! Profile event listeners registered by the server.

use domain::events::{ProfileEvent, ProfileListener};
use tracing::info;

/// Logs every profile event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl ProfileListener for LoggingListener {
    fn on_event(&self, event: &ProfileEvent) {
        let profile = event.profile();
        let id = profile.id.as_ref().map(|id| id.as_str()).unwrap_or("-");
        info!(event = event.kind(), id = %id, email = %profile.email, "profile event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::events::EventPublisher;
    use domain::{Profile, ProfileId};
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn logs_each_created_profile() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();

        let publisher = EventPublisher::new();
        publisher.subscribe(Arc::new(LoggingListener));
        tracing::subscriber::with_default(subscriber, || {
            publisher.publish(&ProfileEvent::Created(Profile::with_id(
                ProfileId::new("p1").unwrap(),
                "a@x.com",
            )));
            // Unsaved profile: no id to log
            publisher.publish(&ProfileEvent::Created(Profile::new("b@x.com")));
        });

        let lines: Vec<_> = captured.text().lines().map(str::to_string).collect();
        assert_eq!(lines.len(), 2, "{lines:?}");
        assert!(lines[0].contains("profile_created"));
        assert!(lines[0].contains("id=p1"));
        assert!(lines[0].contains("email=a@x.com"));
        assert!(lines[1].contains("id=-"));
        assert!(lines[1].contains("email=b@x.com"));
    }
}
