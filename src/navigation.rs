//! Plow maneuver state machine.
//!
//! The navigator cycles through a fixed maneuver sequence: wait for the row
//! to appear, approach along it, stop when the row ends, turn onto the next
//! row, and repeat. Each tick consumes one sweep through the scanner, then
//! dispatches exactly one state handler; handlers issue at most one set of
//! actuator commands and decide the next state.

use crate::config::{FurrowConfig, ManeuverTuning};
use crate::geometry::Point;
use crate::link::RobotLink;
use crate::scanner::{Scanner, SubLine};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// The active maneuver. Exactly one is active at a time; transitions happen
/// only inside the navigator's own dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    /// Hold position until enough of the row is detected.
    Wait,
    /// Drive forward along the row.
    Approach,
    /// Brake at the end of the row, or keep correcting steering while the
    /// row is still visible.
    StopAndEvaluate,
    /// Headland turn onto the next row, phased by odometer distance.
    Turn,
}

impl Maneuver {
    /// Name for display and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Maneuver::Wait => "wait",
            Maneuver::Approach => "approach",
            Maneuver::StopAndEvaluate => "stop_and_evaluate",
            Maneuver::Turn => "turn",
        }
    }
}

/// Navigation core: clustering scanner plus the maneuver state machine.
pub struct Navigator {
    scanner: Scanner,
    tuning: ManeuverTuning,
    maneuver: Maneuver,
    /// Odometer distance captured on the first tick of a turn. `None`
    /// until the turn's first tick runs.
    turn_reference: Option<f64>,
    /// Cumulative ground_speed * dt integral. Never reset.
    run_distance: f64,
    /// Duration of the last clustering pass.
    scan_time: Duration,
    last_update: Instant,
}

impl Navigator {
    pub fn new(config: &FurrowConfig) -> Self {
        Self {
            scanner: Scanner::new(&config.scanner),
            tuning: config.maneuver.clone(),
            maneuver: Maneuver::Wait,
            turn_reference: None,
            run_distance: 0.0,
            scan_time: Duration::ZERO,
            last_update: Instant::now(),
        }
    }

    /// One wall-clock tick: measures the time since the previous update and
    /// delegates to [`Navigator::step`].
    pub fn update(&mut self, link: &mut impl RobotLink) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_update);
        self.last_update = now;
        self.step(link, dt);
    }

    /// One tick with an explicit time step (used by simulations and tests).
    ///
    /// Order per tick: acquire the sweep snapshot and run the scanner,
    /// integrate run distance, then dispatch the active maneuver handler
    /// exactly once. A contended snapshot skips both the scanner and the
    /// dispatch; the previous tick's state remains valid and the next tick
    /// retries naturally.
    pub fn step(&mut self, link: &mut impl RobotLink, dt: Duration) {
        let sweep = link.try_sweep();
        if let Some(sweep) = &sweep {
            let started = Instant::now();
            self.scanner.update(sweep);
            self.scan_time = started.elapsed();
        }

        // Run distance integrates every tick regardless of maneuver state
        // and regardless of whether new sweep data arrived.
        self.run_distance += link.odometer_speed() * dt.as_secs_f64();

        if sweep.is_none() {
            debug!("Sweep snapshot contended, keeping previous state");
            return;
        }

        match self.maneuver {
            Maneuver::Wait => self.wait(link),
            Maneuver::Approach => self.approach(link),
            Maneuver::StopAndEvaluate => self.stop_and_evaluate(link),
            Maneuver::Turn => self.turn(link),
        }
    }

    fn transition(&mut self, next: Maneuver) {
        info!("Maneuver: {} -> {}", self.maneuver.as_str(), next.as_str());
        self.maneuver = next;
    }

    /// Hold until more than the threshold number of obstacles is flagged.
    fn wait(&mut self, link: &mut impl RobotLink) {
        if link.obstacle_count() > self.tuning.wait_detection_threshold {
            self.transition(Maneuver::Approach);
        }
    }

    /// Drive into the row, then hand over to the stop evaluation.
    fn approach(&mut self, link: &mut impl RobotLink) {
        if link.obstacle_count() > 0 {
            link.set_motor(self.tuning.approach_speed, 0);
        }
        // No detections on the very tick after entry: issue no command and
        // let stop_and_evaluate sort it out.
        self.transition(Maneuver::StopAndEvaluate);
    }

    /// Brake once the row has ended; keep correcting steering while it is
    /// still in view. The turn starts only after the motor has actually
    /// spun down.
    fn stop_and_evaluate(&mut self, link: &mut impl RobotLink) {
        if link.obstacle_count() == 0 {
            link.set_motor(0, 0);
            if link.motor_speed() <= 0.0 {
                self.turn_reference = None;
                self.transition(Maneuver::Turn);
            }
        } else {
            self.adjust(link);
        }
    }

    /// Headland turn, phased on odometer distance since the turn began.
    ///
    /// The first tick only captures the reference distance and zeroes the
    /// gyro heading; the bands start counting from the next tick. All band
    /// edges compare strictly, so an elapsed value exactly on an edge falls
    /// into the following band.
    fn turn(&mut self, link: &mut impl RobotLink) {
        let distance = link.odometer_distance();
        let reference = match self.turn_reference {
            None => {
                link.gyro_reset();
                self.turn_reference = Some(distance);
                debug!("Turn reference captured at odometer {:.2}", distance);
                return;
            }
            Some(reference) => reference,
        };

        let elapsed = distance - reference;
        let k_out = self.tuning.track_constant_out;
        let k_in = self.tuning.track_constant_in;
        let speed = self.tuning.turn_speed;
        let steer = self.tuning.turn_steer;

        if elapsed < 2.0 * k_out {
            link.set_speed(speed);
        } else if elapsed < 4.0 * k_out {
            link.set_steering(steer);
            link.set_speed(speed);
        } else if elapsed < 11.0 * k_in {
            link.set_steering(-steer);
            link.set_speed(-speed);
        } else if elapsed < 16.0 * k_in {
            link.set_steering(steer);
            link.set_speed(speed);
        } else {
            self.transition(Maneuver::StopAndEvaluate);
        }
    }

    /// Row-following steering correction from the two nearest sub-lines.
    fn adjust(&self, link: &mut impl RobotLink) {
        let (near_a, near_b) =
            near_points(self.scanner.sub_lines(), self.tuning.near_point_range_mm);
        if near_a.x == 0.0 && near_a.y == 0.0 && near_b.x == 0.0 && near_b.y == 0.0 {
            debug!("No sub-lines in steering range");
        }
        apply_adjustment(link, near_a, near_b, &self.tuning);
    }

    // ------------------------------------------------------------------
    // Diagnostics accessors
    // ------------------------------------------------------------------

    /// The clustering engine (epsilon, sub-lines, iteration count).
    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    /// Mutable access to the clustering engine, e.g. to retune epsilon.
    pub fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    /// The active maneuver.
    pub fn maneuver(&self) -> Maneuver {
        self.maneuver
    }

    /// Cumulative ground_speed * dt integral since startup.
    pub fn run_distance(&self) -> f64 {
        self.run_distance
    }

    /// Duration of the last clustering pass.
    pub fn scan_time(&self) -> Duration {
        self.scan_time
    }
}

/// Pick representative near points from the two sub-lines whose first point
/// lies closest to the robot.
///
/// Both slots start at the origin with `initial_range` as their beaten
/// distance; a line that beats slot A does not demote A's previous holder
/// to slot B. The representative is each line's *second* point rather than
/// the nearest extremity, which damps jitter at the segment end.
fn near_points(sub_lines: &[SubLine], initial_range: f64) -> (Point, Point) {
    let mut near_a = Point::origin();
    let mut near_b = Point::origin();
    let mut dist_a = initial_range;
    let mut dist_b = initial_range;

    for line in sub_lines {
        let candidate = line[0];
        let d = candidate.range();
        if d < dist_a {
            near_a = line[1];
            dist_a = d;
        } else if d < dist_b {
            near_b = line[1];
            dist_b = d;
        }
    }

    (near_a, near_b)
}

/// The steering decision chain.
///
/// Four independent tests over the near-point ranges and x signs; the
/// trailing `else` binds to the last test only, so whenever the fourth test
/// is false the steering is forced back to 0 even if an earlier branch
/// fired. Kept exactly as tuned on the field hardware.
fn apply_adjustment(link: &mut impl RobotLink, near_a: Point, near_b: Point, tuning: &ManeuverTuning) {
    let dist_a = near_a.range();
    let dist_b = near_b.range();
    let gap = dist_a - dist_b;
    let steer = tuning.steer_angle;

    if gap < tuning.adjust_gap_mm && gap > 0.0 && near_a.x < 0.0 {
        link.set_steering(-steer);
    }
    if gap < tuning.adjust_gap_mm && gap > 0.0 && near_a.x > 0.0 {
        link.set_steering(steer);
    }
    if gap < 0.0 && near_b.x < 0.0 {
        link.set_steering(steer);
    }
    if gap < 0.0 && near_b.x > 0.0 {
        link.set_steering(-steer);
    } else {
        link.set_steering(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Sweep, SWEEP_RESOLUTION};
    use approx::assert_relative_eq;

    /// Scripted robot link recording every command it receives.
    struct MockLink {
        sweep: Option<Sweep>,
        obstacles: usize,
        motor_speed: f64,
        odo_speed: f64,
        odo_distance: f64,
        speed_cmds: Vec<i8>,
        steer_cmds: Vec<i8>,
        gyro_resets: usize,
    }

    impl Default for MockLink {
        fn default() -> Self {
            Self {
                sweep: Some([0u16; SWEEP_RESOLUTION]),
                obstacles: 0,
                motor_speed: 0.0,
                odo_speed: 0.0,
                odo_distance: 0.0,
                speed_cmds: Vec::new(),
                steer_cmds: Vec::new(),
                gyro_resets: 0,
            }
        }
    }

    impl RobotLink for MockLink {
        fn try_sweep(&mut self) -> Option<Sweep> {
            self.sweep
        }
        fn obstacle_count(&self) -> usize {
            self.obstacles
        }
        fn set_speed(&mut self, speed: i8) {
            self.speed_cmds.push(speed);
        }
        fn set_steering(&mut self, angle: i8) {
            self.steer_cmds.push(angle);
        }
        fn motor_speed(&self) -> f64 {
            self.motor_speed
        }
        fn odometer_speed(&self) -> f64 {
            self.odo_speed
        }
        fn odometer_distance(&self) -> f64 {
            self.odo_distance
        }
        fn gyro_reset(&mut self) {
            self.gyro_resets += 1;
        }
    }

    fn navigator() -> Navigator {
        Navigator::new(&FurrowConfig::default())
    }

    const TICK: Duration = Duration::from_millis(50);

    #[test]
    fn test_wait_holds_without_detections() {
        let mut nav = navigator();
        let mut link = MockLink::default();

        for _ in 0..20 {
            nav.step(&mut link, TICK);
        }
        assert_eq!(nav.maneuver(), Maneuver::Wait);
        assert!(link.speed_cmds.is_empty());
        assert!(link.steer_cmds.is_empty());
    }

    #[test]
    fn test_wait_requires_more_than_one_detection() {
        let mut nav = navigator();
        let mut link = MockLink::default();

        link.obstacles = 1;
        nav.step(&mut link, TICK);
        assert_eq!(nav.maneuver(), Maneuver::Wait);

        link.obstacles = 2;
        nav.step(&mut link, TICK);
        assert_eq!(nav.maneuver(), Maneuver::Approach);
    }

    #[test]
    fn test_approach_commands_and_advances() {
        let mut nav = navigator();
        nav.maneuver = Maneuver::Approach;
        let mut link = MockLink::default();
        link.obstacles = 1;

        nav.step(&mut link, TICK);
        assert_eq!(link.speed_cmds, vec![60]);
        assert_eq!(link.steer_cmds, vec![0]);
        assert_eq!(nav.maneuver(), Maneuver::StopAndEvaluate);
    }

    #[test]
    fn test_approach_without_detection_issues_no_command() {
        let mut nav = navigator();
        nav.maneuver = Maneuver::Approach;
        let mut link = MockLink::default();

        nav.step(&mut link, TICK);
        assert!(link.speed_cmds.is_empty());
        assert!(link.steer_cmds.is_empty());
        // Advances unconditionally either way.
        assert_eq!(nav.maneuver(), Maneuver::StopAndEvaluate);
    }

    #[test]
    fn test_stop_waits_for_motor_spin_down() {
        let mut nav = navigator();
        nav.maneuver = Maneuver::StopAndEvaluate;
        let mut link = MockLink::default();
        link.motor_speed = 12.0;

        nav.step(&mut link, TICK);
        assert_eq!(link.speed_cmds, vec![0]);
        assert_eq!(link.steer_cmds, vec![0]);
        assert_eq!(nav.maneuver(), Maneuver::StopAndEvaluate);

        link.motor_speed = 0.0;
        nav.step(&mut link, TICK);
        assert_eq!(nav.maneuver(), Maneuver::Turn);
        assert!(nav.turn_reference.is_none());
    }

    #[test]
    fn test_stop_with_detections_runs_steering_heuristic() {
        let mut nav = navigator();
        nav.maneuver = Maneuver::StopAndEvaluate;
        let mut link = MockLink::default();
        link.obstacles = 3;

        // All-zero sweep: no sub-lines, near points are both sentinels, the
        // chain falls through to the final else.
        nav.step(&mut link, TICK);
        assert_eq!(link.steer_cmds, vec![0]);
        assert!(link.speed_cmds.is_empty());
        assert_eq!(nav.maneuver(), Maneuver::StopAndEvaluate);
    }

    #[test]
    fn test_turn_first_tick_captures_reference_and_resets_gyro() {
        let mut nav = navigator();
        nav.maneuver = Maneuver::Turn;
        nav.turn_reference = None;
        let mut link = MockLink::default();
        link.odo_distance = 317.5;

        nav.step(&mut link, TICK);
        assert_eq!(link.gyro_resets, 1);
        assert_eq!(nav.turn_reference, Some(317.5));
        assert!(link.speed_cmds.is_empty());
        assert!(link.steer_cmds.is_empty());
        assert_eq!(nav.maneuver(), Maneuver::Turn);
    }

    #[test]
    fn test_turn_bands_in_order() {
        let mut nav = navigator();
        nav.maneuver = Maneuver::Turn;
        nav.turn_reference = Some(100.0);
        let mut link = MockLink::default();

        // Band 1: elapsed 5 < 2 * 6.645, speed only.
        link.odo_distance = 105.0;
        nav.step(&mut link, TICK);
        assert_eq!(link.speed_cmds, vec![125]);
        assert_eq!(link.steer_cmds, Vec::<i8>::new());

        // Band 2: elapsed 20 < 4 * 6.645.
        link.odo_distance = 120.0;
        nav.step(&mut link, TICK);
        assert_eq!(link.speed_cmds, vec![125, 125]);
        assert_eq!(link.steer_cmds, vec![125]);

        // Band 3: elapsed 50 < 11 * 6.465, reversing.
        link.odo_distance = 150.0;
        nav.step(&mut link, TICK);
        assert_eq!(link.speed_cmds, vec![125, 125, -125]);
        assert_eq!(link.steer_cmds, vec![125, -125]);

        // Band 4: elapsed 100 < 16 * 6.465.
        link.odo_distance = 200.0;
        nav.step(&mut link, TICK);
        assert_eq!(link.speed_cmds, vec![125, 125, -125, 125]);
        assert_eq!(link.steer_cmds, vec![125, -125, 125]);

        // Past the last band: transition out, no commands.
        link.odo_distance = 210.0;
        nav.step(&mut link, TICK);
        assert_eq!(nav.maneuver(), Maneuver::StopAndEvaluate);
        assert_eq!(link.speed_cmds.len(), 4);
        assert_eq!(link.steer_cmds.len(), 3);
    }

    #[test]
    fn test_turn_band_edges_are_exclusive() {
        let mut nav = navigator();
        nav.maneuver = Maneuver::Turn;
        nav.turn_reference = Some(0.0);
        let mut link = MockLink::default();

        // Exactly on the band-2 edge: strict comparison pushes it into
        // band 3 (reverse phase).
        link.odo_distance = 4.0 * 6.645;
        nav.step(&mut link, TICK);
        assert_eq!(link.speed_cmds, vec![-125]);
        assert_eq!(link.steer_cmds, vec![-125]);
    }

    #[test]
    fn test_run_distance_is_exact_speed_dt_sum() {
        let mut nav = navigator();
        let mut link = MockLink::default();

        let schedule = [(10.0, 500u64), (-4.0, 250), (0.0, 1000), (3.5, 200)];
        let mut expected = 0.0;
        for &(speed, millis) in &schedule {
            link.odo_speed = speed;
            let dt = Duration::from_millis(millis);
            nav.step(&mut link, dt);
            expected += speed * dt.as_secs_f64();
        }

        assert_relative_eq!(nav.run_distance(), expected, epsilon = 1e-12);
        assert_relative_eq!(nav.run_distance(), 4.7, epsilon = 1e-9);
    }

    #[test]
    fn test_contended_sweep_skips_dispatch_but_not_run_distance() {
        let mut nav = navigator();
        nav.maneuver = Maneuver::Approach;
        let mut link = MockLink::default();
        link.sweep = None;
        link.obstacles = 2;
        link.odo_speed = 8.0;

        nav.step(&mut link, Duration::from_millis(500));

        // State untouched, no commands, distance still integrated.
        assert_eq!(nav.maneuver(), Maneuver::Approach);
        assert!(link.speed_cmds.is_empty());
        assert_relative_eq!(nav.run_distance(), 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_maneuver_names() {
        assert_eq!(Maneuver::Wait.as_str(), "wait");
        assert_eq!(Maneuver::Approach.as_str(), "approach");
        assert_eq!(Maneuver::StopAndEvaluate.as_str(), "stop_and_evaluate");
        assert_eq!(Maneuver::Turn.as_str(), "turn");
    }

    // ------------------------------------------------------------------
    // Steering heuristic internals
    // ------------------------------------------------------------------

    fn line(first: (f64, f64), second: (f64, f64)) -> SubLine {
        vec![
            Point::new(first.0, first.1),
            Point::new(second.0, second.1),
            Point::new(second.0 + 10.0, second.1 + 10.0),
        ]
    }

    #[test]
    fn test_near_points_sentinels_when_empty() {
        let (a, b) = near_points(&[], 4000.0);
        assert_relative_eq!(a.range(), 0.0);
        assert_relative_eq!(b.range(), 0.0);
    }

    #[test]
    fn test_near_points_takes_second_point_of_each_line() {
        let lines = vec![line((100.0, 50.0), (110.0, 55.0)), line((500.0, 0.0), (510.0, 5.0))];
        let (a, b) = near_points(&lines, 4000.0);
        assert_relative_eq!(a.x, 110.0);
        assert_relative_eq!(a.y, 55.0);
        assert_relative_eq!(b.x, 510.0);
        assert_relative_eq!(b.y, 5.0);
    }

    #[test]
    fn test_near_points_first_slot_wins_without_demotion() {
        // A closer line replaces slot A outright; the previous holder of
        // slot A is not demoted into slot B.
        let lines = vec![
            line((100.0, 50.0), (110.0, 55.0)),
            line((500.0, 0.0), (510.0, 5.0)),
            line((50.0, 10.0), (60.0, 12.0)),
        ];
        let (a, b) = near_points(&lines, 4000.0);
        assert_relative_eq!(a.x, 60.0);
        assert_relative_eq!(b.x, 510.0);
    }

    #[test]
    fn test_near_points_beyond_initial_range_ignored() {
        let lines = vec![line((5000.0, 0.0), (5010.0, 0.0))];
        let (a, b) = near_points(&lines, 4000.0);
        assert_relative_eq!(a.range(), 0.0);
        assert_relative_eq!(b.range(), 0.0);
    }

    #[test]
    fn test_adjustment_small_positive_gap_steers_by_near_a_side() {
        let tuning = ManeuverTuning::default();
        let mut link = MockLink::default();

        // gap = 200 in (0, 300), near_a left of center: first branch fires
        // with -60, then the trailing else overrides with 0 because the
        // fourth test is false.
        apply_adjustment(
            &mut link,
            Point::new(-400.0, 0.0),
            Point::new(200.0, 0.0),
            &tuning,
        );
        assert_eq!(link.steer_cmds, vec![-60, 0]);
    }

    #[test]
    fn test_adjustment_negative_gap_right_line() {
        let tuning = ManeuverTuning::default();
        let mut link = MockLink::default();

        // gap < 0 and near_b on the right: the fourth branch holds the
        // final word, no override.
        apply_adjustment(
            &mut link,
            Point::new(100.0, 0.0),
            Point::new(300.0, 0.0),
            &tuning,
        );
        assert_eq!(link.steer_cmds, vec![-60]);
    }

    #[test]
    fn test_adjustment_negative_gap_left_line_is_overridden() {
        let tuning = ManeuverTuning::default();
        let mut link = MockLink::default();

        // gap < 0 and near_b on the left: third branch fires with 60 but
        // the fourth test is false, so the else forces 0.
        apply_adjustment(
            &mut link,
            Point::new(100.0, 0.0),
            Point::new(-300.0, 0.0),
            &tuning,
        );
        assert_eq!(link.steer_cmds, vec![60, 0]);
    }

    #[test]
    fn test_adjustment_wide_gap_centers_steering() {
        let tuning = ManeuverTuning::default();
        let mut link = MockLink::default();

        // gap = 700 >= 300: nothing fires except the trailing else.
        apply_adjustment(
            &mut link,
            Point::new(800.0, 0.0),
            Point::new(100.0, 0.0),
            &tuning,
        );
        assert_eq!(link.steer_cmds, vec![0]);
    }
}
