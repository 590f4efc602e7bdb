//! Fan-out of a message to every group of the roster.

use std::{collections::HashSet, sync::Arc};

use log::{error, info};

use crate::{line::Messenger, roster::RosterStore};

/// Best-effort broadcast of text messages to the groups the bot belongs to.
///
/// Each group gets its own push. A push failing for one group is logged and
/// the broadcast goes on with the next one; nothing is retried.
pub struct FanOutRelay<M: Messenger> {
    /// Source of the destination groups
    roster: Arc<RosterStore>,
    /// Used to push the message to each group
    messenger: Arc<M>,
}

impl<M: Messenger> FanOutRelay<M> {
    /// Creates a relay pushing through `messenger` to the groups of `roster`.
    pub fn new(roster: Arc<RosterStore>, messenger: Arc<M>) -> Self {
        FanOutRelay { roster, messenger }
    }

    /// Pushes `text` once to every distinct group of the roster.
    ///
    /// # Returns
    ///
    /// The number of groups the message was delivered to.
    ///
    /// # Errors
    ///
    /// Returns an error only if the roster can't be read. Delivery failures
    /// are logged, not returned.
    pub async fn relay(&self, text: &str) -> anyhow::Result<usize> {
        let groups = self.roster.list_groups().await?;
        let mut attempted = HashSet::new();
        let mut delivered = 0;

        for group_id in &groups {
            // The roster may hold duplicates, a failed group isn't retried either
            if !attempted.insert(group_id.as_str()) {
                continue;
            }
            match self.messenger.push_text(group_id, text).await {
                Ok(()) => delivered += 1,
                Err(e) => error!("failed to relay message to group {}: {:#}", group_id, e),
            }
        }

        info!(
            "message relayed to {} of {} groups",
            delivered,
            attempted.len()
        );
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::MockMessenger;
    use mockall::{Sequence, predicate::eq};
    use tempfile::TempDir;

    async fn create_test_roster(dir: &TempDir, groups: &[&str]) -> Arc<RosterStore> {
        let roster = RosterStore::new(dir.path().join("group_id.txt"));
        for group_id in groups {
            roster.add_group(group_id).await.unwrap();
        }
        Arc::new(roster)
    }

    #[tokio::test]
    async fn test_relay_pushes_once_per_distinct_group() {
        let dir = TempDir::new().unwrap();
        let roster = create_test_roster(&dir, &["G1", "G2", "G1"]).await;

        let mut messenger = MockMessenger::new();
        let mut sequence = Sequence::new();
        messenger
            .expect_push_text()
            .with(eq("G1"), eq("hello"))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));
        messenger
            .expect_push_text()
            .with(eq("G2"), eq("hello"))
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_, _| Ok(()));

        let relay = FanOutRelay::new(roster, Arc::new(messenger));

        assert_eq!(relay.relay("hello").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_relay_with_empty_roster_pushes_nothing() {
        let dir = TempDir::new().unwrap();
        let roster = create_test_roster(&dir, &[]).await;

        let mut messenger = MockMessenger::new();
        messenger.expect_push_text().never();

        let relay = FanOutRelay::new(roster, Arc::new(messenger));

        assert_eq!(relay.relay("hello").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_relay_continues_after_a_failure() {
        let dir = TempDir::new().unwrap();
        let roster = create_test_roster(&dir, &["G1", "G2", "G3"]).await;

        let mut messenger = MockMessenger::new();
        messenger
            .expect_push_text()
            .with(eq("G1"), eq("hello"))
            .times(1)
            .returning(|_, _| Ok(()));
        messenger
            .expect_push_text()
            .with(eq("G2"), eq("hello"))
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("bot was kicked")));
        messenger
            .expect_push_text()
            .with(eq("G3"), eq("hello"))
            .times(1)
            .returning(|_, _| Ok(()));

        let relay = FanOutRelay::new(roster, Arc::new(messenger));

        assert_eq!(relay.relay("hello").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_relay_does_not_retry_failed_duplicate() {
        let dir = TempDir::new().unwrap();
        let roster = create_test_roster(&dir, &["G1", "G1"]).await;

        let mut messenger = MockMessenger::new();
        messenger
            .expect_push_text()
            .with(eq("G1"), eq("hello"))
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("timeout")));

        let relay = FanOutRelay::new(roster, Arc::new(messenger));

        assert_eq!(relay.relay("hello").await.unwrap(), 0);
    }
}
