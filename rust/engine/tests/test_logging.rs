use std::sync::{Arc, Mutex};

use blackjack_engine::cards::parse_cards;
use blackjack_engine::game::Game;
use blackjack_engine::player::Bet;
use blackjack_engine::round::Action;
use blackjack_engine::rules::RuleSet;
use tracing::Level;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{Layer, Registry};

#[derive(Debug, Clone)]
struct LogEntry {
    level: Level,
    message: String,
    fields: Vec<(String, String)>,
}

impl LogEntry {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Default)]
struct CaptureLayer {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLayer {
    fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn find(&self, message: &str) -> Option<LogEntry> {
        self.entries().into_iter().find(|e| e.message == message)
    }
}

impl<S: tracing::Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.entries.lock().unwrap().push(LogEntry {
            level: *event.metadata().level(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let value = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

fn capture<F: FnOnce()>(f: F) -> CaptureLayer {
    let layer = CaptureLayer::default();
    let subscriber = Registry::default().with(layer.clone());
    tracing::subscriber::with_default(subscriber, f);
    layer
}

#[test]
fn round_lifecycle_is_logged() {
    let logs = capture(|| {
        let mut game = Game::with_test_stack(
            RuleSet::default(),
            75.0,
            10_000,
            parse_cards("10H 9D 10C 7S").unwrap(),
        );
        let seat = game.add_player("alice", 1_000);
        game.start_round(&[Bet::new(seat, 100)]).unwrap();
        game.play_action(Action::Stand).unwrap();
        game.complete_round().unwrap();
        game.end_session().unwrap();
    });

    let dealt = logs.find("round dealt").expect("deal logged");
    assert_eq!(dealt.level, Level::INFO);
    assert_eq!(dealt.field("round"), Some("1"));
    assert_eq!(dealt.field("hands"), Some("1"));

    let action = logs.find("action applied").expect("action logged");
    assert_eq!(action.level, Level::DEBUG);
    assert_eq!(action.field("action"), Some("stand"));

    let settled = logs.find("round settled").expect("settlement logged");
    assert_eq!(settled.field("net"), Some("100"));

    assert!(logs.find("session ended").is_some());
}

#[test]
fn reaching_the_cut_card_is_logged() {
    let logs = capture(|| {
        let mut game = Game::with_test_stack(
            RuleSet::default(),
            40.0,
            10_000,
            parse_cards("10H 9D 10C 7S 5H").unwrap(),
        );
        let seat = game.add_player("alice", 1_000);
        game.start_round(&[Bet::new(seat, 100)]).unwrap();
    });
    let cut = logs.find("cut card reached").expect("cut card logged");
    assert_eq!(cut.field("dealt"), Some("4"));
}

#[test]
fn failing_sink_is_reported_not_fatal() {
    struct Broken;
    impl blackjack_engine::logger::EventSink for Broken {
        fn record(
            &mut self,
            _record: &blackjack_engine::logger::EventRecord,
        ) -> std::io::Result<()> {
            Err(std::io::Error::other("closed"))
        }
    }

    let logs = capture(|| {
        let mut game = Game::with_test_stack(
            RuleSet::default(),
            75.0,
            10_000,
            parse_cards("10H 9D 10C 7S").unwrap(),
        );
        game.subscribe(Box::new(Broken));
        let seat = game.add_player("alice", 1_000);
        game.start_round(&[Bet::new(seat, 100)]).unwrap();
    });
    let warning = logs.find("event sink failed").expect("warning logged");
    assert_eq!(warning.level, Level::WARN);
}
