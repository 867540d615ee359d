use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cards::Card;
use crate::hand::HandState;
use crate::player::{Bet, PlayerId};
use crate::round::{Action, InsuranceResult, SettlementResult};
use crate::shoe::ShoeStats;

/// Something the engine did, as recorded in the audit trail.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    SessionStarted {
        deck_count: u8,
        /// Whole percent
        penetration: u32,
        house_edge_bp: i32,
    },
    ShoeShuffled {
        total_cards: usize,
        cut_card_position: usize,
    },
    /// Discards shuffled back into a shoe that ran dry mid-round
    ShoeRestocked {
        cards: usize,
    },
    RoundStarted {
        bets: Vec<Bet>,
        player_cards: Vec<Vec<Card>>,
        dealer_up_card: Option<Card>,
    },
    ActionTaken {
        hand_index: usize,
        action: Action,
        cards: Vec<Card>,
        state: HandState,
        total: u8,
    },
    InsuranceTaken {
        hand_index: usize,
        stake: u64,
    },
    InsuranceDeclined {
        hand_index: usize,
    },
    InsuranceResolved {
        dealer_blackjack: bool,
        results: Vec<InsuranceResult>,
    },
    DealerPlayed {
        cards: Vec<Card>,
        total: u8,
    },
    SettlementComputed {
        results: Vec<SettlementResult>,
        shoe: ShoeStats,
    },
    SessionEnded {
        rounds_played: u32,
        net_profit: Vec<(PlayerId, i64)>,
    },
}

/// One audit entry, keyed by session, round number and time.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Session identifier (format: YYYYMMDD-NNNNNN)
    pub session_id: String,
    /// Round number the event belongs to, 0 outside any round
    pub round: u32,
    /// Timestamp (RFC3339)
    pub ts: String,
    pub event: GameEvent,
}

pub fn format_session_id(yyyymmdd: &str, seq: u32) -> String {
    format!("{}-{:06}", yyyymmdd, seq)
}

/// Receives every event the game records.
pub trait EventSink {
    fn record(&mut self, record: &EventRecord) -> std::io::Result<()>;
}

/// In-memory event trail kept by every game.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn for_round(&self, round: u32) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(move |r| r.round == round)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl EventSink for EventLog {
    fn record(&mut self, record: &EventRecord) -> std::io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Appends events as JSON lines (LF only) to a file.
pub struct JsonlEventLogger {
    writer: BufWriter<File>,
}

impl JsonlEventLogger {
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        let f = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(f),
        })
    }
}

impl EventSink for JsonlEventLogger {
    fn record(&mut self, record: &EventRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record).map_err(std::io::Error::other)?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}
