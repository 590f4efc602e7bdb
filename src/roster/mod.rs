//! Roster of the group chats the bot currently belongs to.
//!
//! The roster is fed by join and leave events and read by the fan-out relay
//! to know where authenticated users' messages have to be pushed.
//!
//! # Examples
//!
//! ```no_run
//! use porter::roster::RosterStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let roster = RosterStore::new("./data/group_id.txt".into());
//! roster.add_group("C1234").await?;
//! let groups = roster.list_groups().await?;
//! # Ok(())
//! # }
//! ```

mod roster_store;

pub use crate::roster::roster_store::RosterStore;
