//! End-to-end state machine scenarios against scripted frames.
//!
//! Every asset shares one high-contrast template; they are told apart by
//! disjoint search regions, so "pasting" the template into a region makes
//! exactly that asset visible.

use std::time::{Duration, Instant};

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::capture::Frame;
use crate::config::{Segment, SpinMode};
use crate::error::SessionError;
use crate::games::slots::SlotParams;
use crate::games::wheel::WheelParams;
use crate::games::{Action, Runner, SlotRunner, WheelRunner};
use crate::input::{ActionExecutor, Pacing, RecordingPointer};
use crate::ocr::{FieldFormat, OcrField, StaticRecognizer, TextReader};
use crate::vision::{Asset, Point, Region};

const SPIN_REGION: Region = Region { x: 10, y: 100, w: 60, h: 40 };
const BONUS_REGION: Region = Region { x: 10, y: 10, w: 60, h: 40 };
const AUTOPLAY_REGION: Region = Region { x: 80, y: 100, w: 60, h: 40 };
const STOP_REGION: Region = Region { x: 80, y: 10, w: 60, h: 40 };
const OPEN_REGION: Region = Region { x: 140, y: 10, w: 50, h: 40 };
const BET_UP_REGION: Region = Region { x: 10, y: 60, w: 60, h: 30 };
const BET_DOWN_REGION: Region = Region { x: 140, y: 60, w: 50, h: 30 };

const SPIN_AT: (u32, u32) = (30, 110);
const BONUS_AT: (u32, u32) = (30, 20);
const AUTOPLAY_AT: (u32, u32) = (100, 110);
const STOP_AT: (u32, u32) = (100, 20);
const OPEN_AT: (u32, u32) = (150, 20);
const BET_UP_AT: (u32, u32) = (30, 65);
const BET_DOWN_AT: (u32, u32) = (150, 65);

// Template is 12x12, so a spot at (x, y) matches with center (x+6, y+6).
const SPIN_CENTER: Point = Point { x: 36, y: 116 };
const AUTOPLAY_CENTER: Point = Point { x: 106, y: 116 };
const STOP_CENTER: Point = Point { x: 106, y: 26 };
const BET_UP_CENTER: Point = Point { x: 36, y: 71 };
const BET_DOWN_CENTER: Point = Point { x: 156, y: 71 };

fn template() -> GrayImage {
    GrayImage::from_fn(12, 12, |x, y| {
        if (x / 2 + y / 2) % 2 == 0 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

fn frame_with(spots: &[(u32, u32)]) -> Frame {
    let mut screen = RgbaImage::from_pixel(200, 160, Rgba([30, 30, 30, 255]));
    for &(x, y) in spots {
        for (px, py, pixel) in template().enumerate_pixels() {
            let v = pixel[0];
            screen.put_pixel(x + px, y + py, Rgba([v, v, v, 255]));
        }
    }
    Frame::new(screen, 1)
}

fn asset(name: &str, region: Region) -> Asset {
    Asset::from_template(name, template(), Some(region), Some(0.9)).unwrap()
}

fn executor() -> (ActionExecutor, RecordingPointer) {
    let pointer = RecordingPointer::new();
    let exec = ActionExecutor::new(Box::new(pointer.clone()), Pacing::zero());
    (exec, pointer)
}

fn reader(text: &str) -> TextReader {
    TextReader::with_engine(Box::new(StaticRecognizer(text.to_string())))
}

fn slot_params(mode: SpinMode) -> SlotParams {
    SlotParams {
        game_name: "test-slot".to_string(),
        mode,
        spin_button: Some(asset("spin_button", SPIN_REGION)),
        autoplay_button: Some(asset("autoplay_button", AUTOPLAY_REGION)),
        autoplay_confirm: None,
        autoplay_stop: None,
        bonus: Some(asset("bonus_indicator", BONUS_REGION)),
        bet_up: None,
        bet_down: None,
        bet_field: None,
        balance_field: None,
        target_bet: 0.20,
        settle_delay: Duration::from_millis(5),
        poll: Duration::from_millis(10),
        max_wait: Duration::from_millis(500),
        balance_interval: Duration::from_secs(30),
    }
}

fn wheel_params(confirm: Option<Point>) -> WheelParams {
    WheelParams {
        game_name: "test-wheel".to_string(),
        betting_open: asset("betting_open", OPEN_REGION),
        segments: vec![
            Segment {
                name: "1".to_string(),
                click: Point::new(50, 140),
                stack: 2,
            },
            Segment {
                name: "2".to_string(),
                click: Point::new(90, 140),
                stack: 1,
            },
        ],
        confirm,
        balance_field: None,
        poll: Duration::from_millis(10),
        max_wait: Duration::from_millis(500),
        balance_interval: Duration::from_secs(30),
    }
}

// ── Manual slot ──────────────────────────────────────────────────────────

#[test]
fn manual_slot_spins_and_returns_to_idle() {
    let mut runner = SlotRunner::new(slot_params(SpinMode::Manual)).unwrap();
    let (mut exec, pointer) = executor();
    let rd = reader("");
    let ready = frame_with(&[SPIN_AT]);
    let mid_spin = frame_with(&[]);

    // Idle with the spin button visible: click it.
    runner.observe(&ready, &rd);
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(step.action, Action::Click(SPIN_CENTER));
    runner.act(&step, &mut exec).unwrap();
    assert_eq!(pointer.clicks(), vec![SPIN_CENTER]);

    // Round in progress: the button is gone, nothing to do.
    runner.observe(&mid_spin, &rd);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);

    // Button back, no bonus indicator: settle the round and return to idle.
    runner.observe(&ready, &rd);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    assert_eq!(runner.rounds().rounds_played(), 1);

    // Idle again: the next cycle spins again.
    runner.observe(&ready, &rd);
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(step.action, Action::Click(SPIN_CENTER));
}

#[test]
fn manual_slot_waits_out_a_bonus_round_without_clicking() {
    let mut runner = SlotRunner::new(slot_params(SpinMode::Manual)).unwrap();
    let (mut exec, pointer) = executor();
    let rd = reader("");

    // Spin once.
    runner.observe(&frame_with(&[SPIN_AT]), &rd);
    let step = runner.decide(Instant::now()).unwrap();
    runner.act(&step, &mut exec).unwrap();
    assert_eq!(pointer.clicks().len(), 1);

    // Bonus indicator shows: no clicks while it is up.
    let bonus_up = frame_with(&[BONUS_AT]);
    for _ in 0..3 {
        runner.observe(&bonus_up, &rd);
        let step = runner.decide(Instant::now()).unwrap();
        assert_eq!(step.action, Action::Wait);
        runner.act(&step, &mut exec).unwrap();
    }
    assert_eq!(pointer.clicks().len(), 1);

    // Indicator clears: round settles, normal spinning resumes.
    runner.observe(&frame_with(&[]), &rd);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    assert_eq!(runner.rounds().rounds_played(), 1);

    runner.observe(&frame_with(&[SPIN_AT]), &rd);
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(step.action, Action::Click(SPIN_CENTER));
}

#[test]
fn manual_slot_stalls_when_the_spin_button_never_appears() {
    let mut runner = SlotRunner::new(slot_params(SpinMode::Manual)).unwrap();
    let rd = reader("");

    runner.observe(&frame_with(&[]), &rd);
    let later = Instant::now() + Duration::from_millis(600);
    let err = runner.decide(later).unwrap_err();
    assert!(matches!(err, SessionError::Stalled { .. }));
    assert!(runner.finished(), "a stall must force the terminal state");
}

// ── Autoplay slot ────────────────────────────────────────────────────────

#[test]
fn autoplay_engages_once_then_only_monitors() {
    let mut runner = SlotRunner::new(slot_params(SpinMode::Autoplay)).unwrap();
    let (mut exec, pointer) = executor();
    let rd = reader("");

    // Activation button visible: click it once.
    runner.observe(&frame_with(&[AUTOPLAY_AT]), &rd);
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(step.action, Action::Click(AUTOPLAY_CENTER));
    runner.act(&step, &mut exec).unwrap();

    // Autoplay running: monitoring issues no input.
    for _ in 0..3 {
        runner.observe(&frame_with(&[]), &rd);
        let step = runner.decide(Instant::now()).unwrap();
        assert_eq!(step.action, Action::Wait);
        runner.act(&step, &mut exec).unwrap();
    }
    assert_eq!(pointer.clicks().len(), 1);

    // Bonus during autoplay: still no clicking, resume monitoring after.
    runner.observe(&frame_with(&[BONUS_AT]), &rd);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    runner.observe(&frame_with(&[]), &rd);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    assert_eq!(runner.rounds().rounds_played(), 1);

    // The UI halted autoplay: the activation button is back, re-engage.
    runner.observe(&frame_with(&[AUTOPLAY_AT]), &rd);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    runner.observe(&frame_with(&[AUTOPLAY_AT]), &rd);
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(step.action, Action::Click(AUTOPLAY_CENTER));
    runner.act(&step, &mut exec).unwrap();
    assert_eq!(pointer.clicks().len(), 2);
}

#[test]
fn autoplay_shutdown_clicks_the_stop_control() {
    let mut params = slot_params(SpinMode::Autoplay);
    params.autoplay_stop = Some(asset("autoplay_stop", STOP_REGION));
    let mut runner = SlotRunner::new(params).unwrap();
    let (mut exec, pointer) = executor();
    let rd = reader("");

    runner.observe(&frame_with(&[AUTOPLAY_AT]), &rd);
    let step = runner.decide(Instant::now()).unwrap();
    runner.act(&step, &mut exec).unwrap();

    runner.begin_shutdown();
    runner.observe(&frame_with(&[STOP_AT]), &rd);
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(step.action, Action::Click(STOP_CENTER));
    runner.act(&step, &mut exec).unwrap();
    assert!(runner.finished());
    assert_eq!(pointer.clicks(), vec![AUTOPLAY_CENTER, STOP_CENTER]);
}

// ── Bet adjustment ───────────────────────────────────────────────────────

#[test]
fn bet_is_floored_then_stepped_up_to_target() {
    let mut params = slot_params(SpinMode::Manual);
    params.bet_down = Some(asset("bet_down", BET_DOWN_REGION));
    params.bet_up = Some(asset("bet_up", BET_UP_REGION));
    params.bet_field = Some(OcrField {
        name: "bet_amount".to_string(),
        region: Region::new(0, 0, 40, 16),
        format: FieldFormat::Currency,
    });
    let mut runner = SlotRunner::new(params).unwrap();
    let (mut exec, pointer) = executor();
    let controls = frame_with(&[SPIN_AT, BET_UP_AT, BET_DOWN_AT]);

    // Bet reads high: mash bet-down to the floor.
    runner.observe(&controls, &reader("$0.50"));
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(
        step.action,
        Action::Sequence(vec![BET_DOWN_CENTER; 20])
    );
    runner.act(&step, &mut exec).unwrap();
    assert_eq!(pointer.clicks().len(), 20);

    // Now below target: step up one click per cycle.
    runner.observe(&controls, &reader("$0.10"));
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(step.action, Action::Click(BET_UP_CENTER));

    // On target: setup done, normal play starts.
    runner.observe(&controls, &reader("$0.20"));
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    runner.observe(&controls, &reader("$0.20"));
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(step.action, Action::Click(SPIN_CENTER));
}

#[test]
fn bet_already_on_target_skips_adjustment() {
    let mut params = slot_params(SpinMode::Manual);
    params.bet_down = Some(asset("bet_down", BET_DOWN_REGION));
    params.bet_field = Some(OcrField {
        name: "bet_amount".to_string(),
        region: Region::new(0, 0, 40, 16),
        format: FieldFormat::Currency,
    });
    let mut runner = SlotRunner::new(params).unwrap();
    let controls = frame_with(&[SPIN_AT, BET_DOWN_AT]);

    runner.observe(&controls, &reader("$0.20"));
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    runner.observe(&controls, &reader("$0.20"));
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(step.action, Action::Click(SPIN_CENTER));
}

// ── Wheel game ───────────────────────────────────────────────────────────

#[test]
fn wheel_bets_exactly_once_per_window() {
    let mut runner = WheelRunner::new(wheel_params(None)).unwrap();
    let (mut exec, pointer) = executor();
    let rd = reader("");
    let open = frame_with(&[OPEN_AT]);
    let closed = frame_with(&[]);

    // Window opens: stack chips per segment, in config order.
    runner.observe(&open, &rd);
    let step = runner.decide(Instant::now()).unwrap();
    assert_eq!(
        step.action,
        Action::Sequence(vec![
            Point::new(50, 140),
            Point::new(50, 140),
            Point::new(90, 140),
        ])
    );
    runner.act(&step, &mut exec).unwrap();
    assert_eq!(pointer.clicks().len(), 3);

    // The indicator stays up: the bet is already placed, never re-click.
    for _ in 0..3 {
        runner.observe(&open, &rd);
        let step = runner.decide(Instant::now()).unwrap();
        assert_eq!(step.action, Action::Wait);
        runner.act(&step, &mut exec).unwrap();
    }
    assert_eq!(pointer.clicks().len(), 3);

    // Window closes: that was one round.
    runner.observe(&closed, &rd);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    assert_eq!(runner.rounds().rounds_played(), 1);

    // Next window: exactly one more batch.
    runner.observe(&open, &rd);
    let step = runner.decide(Instant::now()).unwrap();
    runner.act(&step, &mut exec).unwrap();
    assert_eq!(pointer.clicks().len(), 6);
}

#[test]
fn wheel_appends_the_confirm_click() {
    let mut runner = WheelRunner::new(wheel_params(Some(Point::new(120, 150)))).unwrap();
    let rd = reader("");

    runner.observe(&frame_with(&[OPEN_AT]), &rd);
    let step = runner.decide(Instant::now()).unwrap();
    match step.action {
        Action::Sequence(points) => {
            assert_eq!(points.len(), 4);
            assert_eq!(points[3], Point::new(120, 150));
        }
        other => panic!("expected a click sequence, got {other:?}"),
    }
}

#[test]
fn wheel_stalls_when_betting_never_opens() {
    let mut runner = WheelRunner::new(wheel_params(None)).unwrap();
    let rd = reader("");

    runner.observe(&frame_with(&[]), &rd);
    let later = Instant::now() + Duration::from_millis(600);
    match runner.decide(later).unwrap_err() {
        SessionError::Stalled { expecting, .. } => assert_eq!(expecting, "betting_open"),
        other => panic!("expected a stall, got {other:?}"),
    }
    assert!(runner.finished());
}

#[test]
fn wheel_stalls_when_the_window_never_closes() {
    let mut runner = WheelRunner::new(wheel_params(None)).unwrap();
    let (mut exec, _pointer) = executor();
    let rd = reader("");
    let open = frame_with(&[OPEN_AT]);

    runner.observe(&open, &rd);
    let step = runner.decide(Instant::now()).unwrap();
    runner.act(&step, &mut exec).unwrap();

    runner.observe(&open, &rd);
    let later = Instant::now() + Duration::from_millis(600);
    assert!(matches!(
        runner.decide(later),
        Err(SessionError::Stalled { .. })
    ));
}

#[test]
fn shutdown_is_reachable_from_any_wheel_state() {
    let mut runner = WheelRunner::new(wheel_params(None)).unwrap();
    let rd = reader("");

    runner.observe(&frame_with(&[OPEN_AT]), &rd);
    runner.decide(Instant::now()).unwrap();

    runner.begin_shutdown();
    runner.observe(&frame_with(&[OPEN_AT]), &rd);
    assert_eq!(runner.decide(Instant::now()).unwrap().action, Action::Wait);
    assert!(runner.finished());
}
