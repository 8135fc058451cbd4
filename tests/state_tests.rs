use tapmetro::{AccelSample, BeatScheduler, SessionState, Settings, TempoUpdate, TimerAction};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_initialization() {
        let scheduler = BeatScheduler::new(&Settings::default());
        assert_eq!(scheduler.state(), SessionState::Idle);
        assert_eq!(scheduler.bpm(), 120);
        assert!(!scheduler.status().tap_flash);
    }

    #[test]
    fn test_advance_follows_fixed_cycle() {
        let mut scheduler = BeatScheduler::new(&Settings::default());
        let expected = [
            SessionState::Sampling,
            SessionState::Vibing,
            SessionState::Idle,
        ];
        for round in 0..5 {
            for (i, state) in expected.iter().enumerate() {
                scheduler.advance_state((round * 3 + i) as u64 * 1000);
                assert_eq!(scheduler.state(), *state);
            }
        }
    }

    #[test]
    fn test_next_state_table() {
        assert_eq!(SessionState::Idle.next(), SessionState::Sampling);
        assert_eq!(SessionState::Sampling.next(), SessionState::Vibing);
        assert_eq!(SessionState::Vibing.next(), SessionState::Idle);
    }

    #[test]
    fn test_entering_vibing_reanchors() {
        let mut scheduler = BeatScheduler::new(&Settings::default());
        scheduler.advance_state(0);
        scheduler.advance_state(42_000);
        let estimate = scheduler.estimate();
        assert_eq!(estimate.bpm_start_time, 42_000);
        // Beat 1 is already armed, so the next one to schedule is beat 2.
        assert_eq!(estimate.tick_count, 2);
    }

    #[test]
    fn test_nudges_allowed_in_every_state() {
        let mut scheduler = BeatScheduler::new(&Settings::default());
        for _ in 0..3 {
            let action = scheduler.nudge_bpm(1, 10);
            match scheduler.state() {
                SessionState::Vibing => assert!(matches!(action, TimerAction::Arm { .. })),
                _ => assert_eq!(action, TimerAction::Keep),
            }
            scheduler.advance_state(20);
        }
        assert_eq!(scheduler.bpm(), 123);
    }

    #[test]
    fn test_repeated_down_nudges_stop_at_one() {
        let mut settings = Settings::default();
        settings.tempo.initial_bpm = 3;
        let mut scheduler = BeatScheduler::new(&settings);
        scheduler.advance_state(0);
        scheduler.advance_state(0);
        for t in 0..10 {
            let action = scheduler.nudge_bpm(-1, t);
            assert!(matches!(action, TimerAction::Arm { .. }));
        }
        assert_eq!(scheduler.bpm(), 1);
        // One beat per minute from the last nudge.
        assert_eq!(scheduler.nudge_bpm(0, 100), TimerAction::Arm { delay_ms: 60_000 });
    }

    #[test]
    fn test_new_session_starts_with_empty_history() {
        let spike = AccelSample::new(0, 0, 1400);
        let rest = AccelSample::new(0, 0, 1000);
        let mut scheduler = BeatScheduler::new(&Settings::default());

        scheduler.advance_state(0);
        for t in [1_000, 1_400, 1_800] {
            scheduler.on_samples(&[spike, rest], t);
        }
        assert_eq!(scheduler.estimator().history().len(), 3);

        scheduler.advance_state(2_000); // Vibing
        scheduler.advance_state(3_000); // Idle
        assert_eq!(scheduler.estimator().history().len(), 3);
        scheduler.advance_state(60_000); // Sampling again
        assert!(scheduler.estimator().history().is_empty());

        let updates = scheduler.on_samples(&[spike, rest], 61_000);
        assert_eq!(
            updates,
            vec![TempoUpdate::Warming {
                recorded: 1,
                needed: 10
            }]
        );
    }
}
