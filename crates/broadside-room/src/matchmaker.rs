//! FIFO matchmaking queue.

use std::collections::VecDeque;

use broadside_protocol::PlayerId;

use crate::{PlayerSender, RoomError};

/// A player who has sent JOIN, with everything a room needs to seat them.
#[derive(Debug, Clone)]
pub struct Entrant {
    pub player_id: PlayerId,
    pub name: String,
    /// Outbound queue to the player's connection.
    pub sender: PlayerSender,
}

impl Entrant {
    /// A waiting entrant whose connection handler is gone can't be paired.
    fn is_gone(&self) -> bool {
        self.sender.is_closed()
    }
}

/// What [`Matchmaker::enqueue`] did with the entrant.
#[derive(Debug)]
pub enum Enqueued {
    /// Nobody was waiting; the entrant is now in the queue.
    Waiting,

    /// The entrant was paired with the longest-waiting player, who is
    /// `first`. Both are out of the queue.
    Paired { first: Entrant, second: Entrant },
}

/// Players waiting for an opponent, oldest first.
///
/// `Matchmaker` is NOT thread-safe by itself. The
/// [`RoomManager`](crate::RoomManager) owns it, and the server holds the
/// manager behind one mutex, so each `enqueue` is a single atomic
/// check-and-pair.
#[derive(Debug, Default)]
pub struct Matchmaker {
    queue: VecDeque<Entrant>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs `entrant` with the longest-waiting player, or queues it.
    ///
    /// Waiting players whose connection has already gone away are dropped
    /// from the front of the queue rather than paired.
    ///
    /// # Errors
    /// [`RoomError::AlreadyQueued`] if the player is already waiting.
    pub fn enqueue(&mut self, entrant: Entrant) -> Result<Enqueued, RoomError> {
        if self.contains(entrant.player_id) {
            return Err(RoomError::AlreadyQueued(entrant.player_id));
        }
        match self.pop_oldest() {
            Some(first) => {
                tracing::debug!(first = %first.player_id, second = %entrant.player_id, "players paired");
                Ok(Enqueued::Paired {
                    first,
                    second: entrant,
                })
            }
            None => {
                tracing::debug!(player_id = %entrant.player_id, "player waiting for opponent");
                self.queue.push_back(entrant);
                Ok(Enqueued::Waiting)
            }
        }
    }

    fn pop_oldest(&mut self) -> Option<Entrant> {
        while let Some(waiting) = self.queue.pop_front() {
            if !waiting.is_gone() {
                return Some(waiting);
            }
            tracing::debug!(player_id = %waiting.player_id, "dropping stale queue entry");
        }
        None
    }

    /// Removes a waiting player. Returns `true` if they were queued.
    pub fn remove(&mut self, player_id: PlayerId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|e| e.player_id != player_id);
        before != self.queue.len()
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.queue.iter().any(|e| e.player_id == player_id)
    }

    /// Waiting player ids, oldest first.
    pub fn waiting(&self) -> Vec<PlayerId> {
        self.queue.iter().map(|e| e.player_id).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use broadside_protocol::ServerEvent;

    fn entrant(id: u64) -> (Entrant, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let entrant = Entrant {
            player_id: PlayerId(id),
            name: format!("player-{id}"),
            sender: tx,
        };
        (entrant, rx)
    }

    fn paired_ids(outcome: Enqueued) -> (PlayerId, PlayerId) {
        match outcome {
            Enqueued::Paired { first, second } => (first.player_id, second.player_id),
            Enqueued::Waiting => panic!("expected a pairing"),
        }
    }

    #[test]
    fn test_enqueue_first_player_waits() {
        let mut mm = Matchmaker::new();
        let (a, _rx) = entrant(1);
        assert!(matches!(mm.enqueue(a).unwrap(), Enqueued::Waiting));
        assert_eq!(mm.waiting(), vec![PlayerId(1)]);
    }

    #[test]
    fn test_enqueue_second_player_pairs_with_first() {
        let mut mm = Matchmaker::new();
        let (a, _ra) = entrant(1);
        let (b, _rb) = entrant(2);
        mm.enqueue(a).unwrap();

        assert_eq!(paired_ids(mm.enqueue(b).unwrap()), (PlayerId(1), PlayerId(2)));
        assert!(mm.is_empty());
    }

    #[test]
    fn test_enqueue_pairs_longest_waiting_first() {
        let mut mm = Matchmaker::new();
        let mut receivers = Vec::new();
        for id in [1, 2, 3] {
            let (e, rx) = entrant(id);
            receivers.push(rx);
            mm.queue.push_back(e);
        }
        let (d, _rd) = entrant(4);

        assert_eq!(paired_ids(mm.enqueue(d).unwrap()), (PlayerId(1), PlayerId(4)));
        assert_eq!(mm.waiting(), vec![PlayerId(2), PlayerId(3)]);
    }

    #[test]
    fn test_enqueue_twice_is_rejected() {
        let mut mm = Matchmaker::new();
        let (a, _ra) = entrant(1);
        mm.enqueue(a.clone()).unwrap();
        assert!(matches!(mm.enqueue(a), Err(RoomError::AlreadyQueued(PlayerId(1)))));
        assert_eq!(mm.len(), 1);
    }

    #[test]
    fn test_enqueue_skips_disconnected_waiter() {
        let mut mm = Matchmaker::new();
        let (a, ra) = entrant(1);
        let (b, _rb) = entrant(2);
        mm.queue.push_back(a);
        mm.queue.push_back(b);
        drop(ra);

        let (c, _rc) = entrant(3);
        assert_eq!(paired_ids(mm.enqueue(c).unwrap()), (PlayerId(2), PlayerId(3)));
    }

    #[test]
    fn test_remove_takes_player_out_of_queue() {
        let mut mm = Matchmaker::new();
        let (a, _ra) = entrant(1);
        mm.enqueue(a).unwrap();

        assert!(mm.remove(PlayerId(1)));
        assert!(!mm.remove(PlayerId(1)));

        let (b, _rb) = entrant(2);
        assert!(matches!(mm.enqueue(b).unwrap(), Enqueued::Waiting));
    }
}
