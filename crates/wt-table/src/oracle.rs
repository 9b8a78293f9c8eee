//! The physical-roll oracle interface.
//!
//! The oracle (a 3D physics renderer in production, [`InstantOracle`] in
//! tests and the CLI) receives [`OracleRequest`]s over a channel and
//! reports face values back through an [`OracleResolver`]. Each roll is
//! correlated by a unique id; completions resolve a oneshot promise held
//! in a shared pending map. A pending entry is removed exactly once —
//! either by the completion or by the roller's timeout, whichever fires
//! first — so a late completion can never cross-contaminate another roll.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use wt_dice::{DiceRequest, PhysicalResult};

/// Correlation identifier for one roll in flight.
pub type RollId = Uuid;

/// A request for the oracle to resolve physical dice.
#[derive(Debug)]
pub struct OracleRequest {
    /// Correlation id of the roll this request belongs to.
    pub roll_id: RollId,
    /// The dice to resolve, one entry per notation group.
    pub dice: Vec<DiceRequest>,
    /// Forced face values (server-authoritative replays). The oracle
    /// should make the matching dice land on these.
    pub targets: Vec<PhysicalResult>,
}

type PendingMap = Arc<Mutex<HashMap<RollId, oneshot::Sender<Vec<PhysicalResult>>>>>;

fn take_pending(
    pending: &PendingMap,
    roll_id: RollId,
) -> Option<oneshot::Sender<Vec<PhysicalResult>>> {
    pending
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&roll_id)
}

/// The roller's side of the oracle connection.
#[derive(Debug)]
pub struct OracleLink {
    requests: mpsc::UnboundedSender<OracleRequest>,
    pending: PendingMap,
}

impl OracleLink {
    /// Create a link and the request stream the oracle consumes.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OracleRequest>) {
        let (requests, receiver) = mpsc::unbounded_channel();
        let link = Self {
            requests,
            pending: Arc::new(Mutex::new(HashMap::new())),
        };
        (link, receiver)
    }

    /// The completion handle the oracle uses to report results.
    pub fn resolver(&self) -> OracleResolver {
        OracleResolver {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Send a request and wait for its completion, bounded by `timeout`.
    ///
    /// Returns `None` when the oracle is gone, dropped the roll, or timed
    /// out — the caller synthesizes fallback results in all three cases.
    pub(crate) async fn request(
        &self,
        roll_id: RollId,
        dice: Vec<DiceRequest>,
        targets: Vec<PhysicalResult>,
        timeout: Duration,
    ) -> Option<Vec<PhysicalResult>> {
        let (sender, receiver) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(roll_id, sender);

        let request = OracleRequest {
            roll_id,
            dice,
            targets,
        };
        if self.requests.send(request).is_err() {
            take_pending(&self.pending, roll_id);
            tracing::warn!(%roll_id, "oracle channel closed, falling back to local synthesis");
            return None;
        }

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(results)) => Some(results),
            Ok(Err(_)) => {
                take_pending(&self.pending, roll_id);
                tracing::warn!(%roll_id, "oracle dropped the roll, falling back to local synthesis");
                None
            }
            Err(_) => {
                take_pending(&self.pending, roll_id);
                tracing::warn!(
                    %roll_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "oracle timed out, synthesizing fallback results"
                );
                None
            }
        }
    }
}

/// The oracle's side of the connection: completes rolls by id.
#[derive(Debug, Clone)]
pub struct OracleResolver {
    pending: PendingMap,
}

impl OracleResolver {
    /// Deliver results for a roll. Returns false when the roll is unknown
    /// or already resolved (e.g. the roller's timeout won the race).
    pub fn complete(&self, roll_id: RollId, results: Vec<PhysicalResult>) -> bool {
        match take_pending(&self.pending, roll_id) {
            Some(sender) => sender.send(results).is_ok(),
            None => {
                tracing::warn!(%roll_id, "completion for unknown or expired roll, dropping");
                false
            }
        }
    }
}

/// Resolve dice requests locally: drain forced target values first
/// (matching by die type), then roll the remainder from `rng`.
pub fn synthesize_results(
    dice: &[DiceRequest],
    targets: &[PhysicalResult],
    rng: &mut StdRng,
) -> Vec<PhysicalResult> {
    let mut available = vec![true; targets.len()];
    let mut out = Vec::new();
    for request in dice {
        for _ in 0..request.count {
            let slot = (0..targets.len()).find(|&i| available[i] && targets[i].die == request.die);
            match slot {
                Some(i) => {
                    available[i] = false;
                    out.push(targets[i]);
                }
                None => out.push(PhysicalResult {
                    die: request.die,
                    value: rng.random_range(1..=request.die.sides()),
                }),
            }
        }
    }
    out
}

/// A no-physics oracle that answers every request immediately with
/// seeded random values, honoring forced targets. Used by the CLI and
/// for server-authoritative instant mode.
pub struct InstantOracle;

impl InstantOracle {
    /// Serve requests until the channel closes.
    pub fn spawn(
        mut requests: mpsc::UnboundedReceiver<OracleRequest>,
        resolver: OracleResolver,
        seed: u64,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(seed);
            while let Some(request) = requests.recv().await {
                let results = synthesize_results(&request.dice, &request.targets, &mut rng);
                resolver.complete(request.roll_id, results);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wt_dice::Die;

    fn d(die: Die, value: u32) -> PhysicalResult {
        PhysicalResult { die, value }
    }

    #[tokio::test]
    async fn completion_resolves_request() {
        let (link, mut requests) = OracleLink::channel();
        let resolver = link.resolver();
        let roll_id = Uuid::new_v4();

        let oracle = tokio::spawn(async move {
            let request = requests.recv().await.expect("request");
            assert_eq!(request.roll_id, roll_id);
            resolver.complete(request.roll_id, vec![d(Die::D20, 15)]);
        });

        let results = link
            .request(
                roll_id,
                vec![DiceRequest {
                    die: Die::D20,
                    count: 1,
                }],
                vec![],
                Duration::from_secs(10),
            )
            .await;
        assert_eq!(results, Some(vec![d(Die::D20, 15)]));
        oracle.await.expect("oracle task");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_returns_none_and_clears_pending() {
        let (link, requests) = OracleLink::channel();
        let resolver = link.resolver();
        let roll_id = Uuid::new_v4();

        // Keep the receiver alive but never answer; paused time makes the
        // 10s timeout fire immediately.
        let results = link
            .request(
                roll_id,
                vec![DiceRequest {
                    die: Die::D6,
                    count: 2,
                }],
                vec![],
                Duration::from_secs(10),
            )
            .await;
        assert_eq!(results, None);

        // Late completion finds no pending entry.
        assert!(!resolver.complete(roll_id, vec![d(Die::D6, 3)]));
        drop(requests);
    }

    #[tokio::test]
    async fn closed_channel_returns_none() {
        let (link, requests) = OracleLink::channel();
        drop(requests);
        let results = link
            .request(
                Uuid::new_v4(),
                vec![DiceRequest {
                    die: Die::D6,
                    count: 1,
                }],
                vec![],
                Duration::from_secs(10),
            )
            .await;
        assert_eq!(results, None);
    }

    #[tokio::test]
    async fn concurrent_rolls_do_not_cross_contaminate() {
        let (link, mut requests) = OracleLink::channel();
        let resolver = link.resolver();
        let link = Arc::new(link);

        let id_a = Uuid::new_v4();
        let id_b = Uuid::new_v4();
        let one_d20 = vec![DiceRequest {
            die: Die::D20,
            count: 1,
        }];

        let oracle = tokio::spawn(async move {
            // Answer both requests in reverse arrival order.
            let first = requests.recv().await.expect("first");
            let second = requests.recv().await.expect("second");
            resolver.complete(second.roll_id, vec![d(Die::D20, 2)]);
            resolver.complete(first.roll_id, vec![d(Die::D20, 1)]);
        });

        let (res_a, res_b) = tokio::join!(
            link.request(id_a, one_d20.clone(), vec![], Duration::from_secs(10)),
            link.request(id_b, one_d20.clone(), vec![], Duration::from_secs(10)),
        );
        // Whichever arrived first gets value 1, the other 2; the point is
        // that each roll gets exactly its own answer.
        let a = res_a.expect("a resolved");
        let b = res_b.expect("b resolved");
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert_ne!(a[0].value, b[0].value);
        oracle.await.expect("oracle task");
    }

    #[test]
    fn synthesis_drains_targets_first() {
        let mut rng = StdRng::seed_from_u64(1);
        let dice = vec![DiceRequest {
            die: Die::D20,
            count: 2,
        }];
        let targets = vec![d(Die::D20, 20)];
        let results = synthesize_results(&dice, &targets, &mut rng);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].value, 20);
        assert!((1..=20).contains(&results[1].value));
    }

    #[test]
    fn synthesis_ignores_mismatched_targets() {
        let mut rng = StdRng::seed_from_u64(1);
        let dice = vec![DiceRequest {
            die: Die::D6,
            count: 1,
        }];
        let targets = vec![d(Die::D20, 20)];
        let results = synthesize_results(&dice, &targets, &mut rng);
        assert_eq!(results[0].die, Die::D6);
        assert!((1..=6).contains(&results[0].value));
    }

    #[tokio::test]
    async fn instant_oracle_honors_targets() {
        let (link, requests) = OracleLink::channel();
        let handle = InstantOracle::spawn(requests, link.resolver(), 42);

        let results = link
            .request(
                Uuid::new_v4(),
                vec![DiceRequest {
                    die: Die::D8,
                    count: 2,
                }],
                vec![d(Die::D8, 8)],
                Duration::from_secs(10),
            )
            .await
            .expect("resolved");
        assert_eq!(results[0].value, 8);
        assert!((1..=8).contains(&results[1].value));

        drop(link);
        handle.await.expect("oracle task");
    }
}
