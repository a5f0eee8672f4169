mod tests {
    use core::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::vec::Vec;

    use embassy_time::{Duration, Instant};
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use stairlight_engine::bus::{
        BusError, RangingSensor, SclBitBang, SensorFault, SensorMux,
    };
    use stairlight_engine::diag::{DiagChannel, DiagEvent};
    use stairlight_engine::installation::{EngineConfig, SharedInstallation};
    use stairlight_engine::mode::ModeId;
    use stairlight_engine::sense_task::SensorTask;

    const MUX_ADDRESS: u8 = 0x70;

    /// Scripted stand-in for the ranging driver behind the multiplexer.
    #[derive(Clone, Default)]
    struct FakeSensor {
        probes: Rc<RefCell<VecDeque<bool>>>,
        reads: Rc<RefCell<VecDeque<Result<u16, SensorFault>>>>,
        read_calls: Rc<RefCell<usize>>,
        continuous_calls: Rc<RefCell<usize>>,
    }

    impl FakeSensor {
        fn script_probes(&self, values: &[bool]) {
            self.probes.borrow_mut().extend(values.iter().copied());
        }

        fn script_reads(&self, values: &[Result<u16, SensorFault>]) {
            self.reads.borrow_mut().extend(values.iter().copied());
        }
    }

    impl RangingSensor for FakeSensor {
        fn probe(&mut self) -> bool {
            self.probes.borrow_mut().pop_front().unwrap_or(false)
        }

        fn start_continuous(&mut self) -> Result<(), SensorFault> {
            *self.continuous_calls.borrow_mut() += 1;
            Ok(())
        }

        fn read_range_mm(&mut self) -> Result<u16, SensorFault> {
            *self.read_calls.borrow_mut() += 1;
            self.reads
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(SensorFault::Timeout))
        }
    }

    #[derive(Clone, Default)]
    struct PulseCounter {
        pulses: Rc<RefCell<Vec<u8>>>,
    }

    impl SclBitBang for PulseCounter {
        fn pulse_clock(&mut self, cycles: u8) {
            self.pulses.borrow_mut().push(cycles);
        }
    }

    /// The transaction triplet of one verified channel selection.
    fn select(channel: u8) -> Vec<I2cTransaction> {
        let mask = 1u8 << channel;
        vec![
            I2cTransaction::write(MUX_ADDRESS, vec![0x00]),
            I2cTransaction::write(MUX_ADDRESS, vec![mask]),
            I2cTransaction::read(MUX_ADDRESS, vec![mask]),
        ]
    }

    fn full_scan() -> Vec<I2cTransaction> {
        (0..8).flat_map(select).collect()
    }

    #[test]
    fn test_select_channel_verifies_readback() {
        let transactions = vec![
            I2cTransaction::write(MUX_ADDRESS, vec![0x00]),
            I2cTransaction::write(MUX_ADDRESS, vec![0b0000_1000]),
            // The enable register reads back empty: selection failed.
            I2cTransaction::read(MUX_ADDRESS, vec![0x00]),
        ];
        let mut i2c = I2cMock::new(&transactions);
        let mut mux = SensorMux::new(i2c.clone(), NoopDelay, FakeSensor::default(), MUX_ADDRESS);

        assert_eq!(
            mux.select_channel(3),
            Err(BusError::ChannelSelect {
                expected: 0b0000_1000,
                got: 0x00
            })
        );
        assert_eq!(mux.select_channel(8), Err(BusError::InvalidChannel));

        i2c.done();
    }

    #[test]
    fn test_read_retries_are_bounded() {
        let transactions: Vec<_> = (0..3).flat_map(|_| select(3)).collect();
        let mut i2c = I2cMock::new(&transactions);
        let sensor = FakeSensor::default();
        sensor.script_reads(&[
            Err(SensorFault::Timeout),
            Err(SensorFault::Timeout),
            Err(SensorFault::Timeout),
        ]);
        let mut mux = SensorMux::new(i2c.clone(), NoopDelay, sensor.clone(), MUX_ADDRESS);

        assert_eq!(mux.read_distance(3), Err(BusError::ReadTimeout));
        assert_eq!(*sensor.read_calls.borrow(), 3);
        // One exhausted read is one strike, not an escalation.
        assert!(!mux.needs_recovery());

        i2c.done();
    }

    #[test]
    fn test_read_success_after_retry() {
        let transactions: Vec<_> = (0..2).flat_map(|_| select(5)).collect();
        let mut i2c = I2cMock::new(&transactions);
        let sensor = FakeSensor::default();
        sensor.script_reads(&[Err(SensorFault::Timeout), Ok(321)]);
        let mut mux = SensorMux::new(i2c.clone(), NoopDelay, sensor.clone(), MUX_ADDRESS);

        assert_eq!(mux.read_distance(5), Ok(321));
        assert_eq!(*sensor.read_calls.borrow(), 2);

        i2c.done();
    }

    #[test]
    fn test_failure_streak_escalates_and_recovery_rescans() {
        // Five exhausted reads in a row, then one recovery pass.
        let mut transactions: Vec<_> = (0..15).flat_map(|_| select(0)).collect();
        transactions.extend(full_scan());
        let mut i2c = I2cMock::new(&transactions);
        let sensor = FakeSensor::default();
        sensor.script_reads(&[Err(SensorFault::Timeout); 15]);
        sensor.script_probes(&[true, true, false, false, false, false, false, false]);
        let mut mux = SensorMux::new(i2c.clone(), NoopDelay, sensor.clone(), MUX_ADDRESS);

        for _ in 0..5 {
            assert_eq!(mux.read_distance(0), Err(BusError::ReadTimeout));
        }
        assert!(mux.needs_recovery());

        let mut unstick = PulseCounter::default();
        let present = mux.recover_bus(&mut unstick);

        assert_eq!(*unstick.pulses.borrow(), vec![9]);
        assert_eq!(present, [true, true, false, false, false, false, false, false]);
        assert!(!mux.needs_recovery());
        assert!(mux.is_ready(0));
        assert!(mux.is_ready(1));
        assert!(!mux.is_ready(2));
        assert_eq!(*sensor.continuous_calls.borrow(), 2);

        i2c.done();
    }

    fn shared_staircase() -> SharedInstallation<60, 2> {
        SharedInstallation::new(&EngineConfig::default())
    }

    #[test]
    fn test_sense_task_scans_then_triggers() {
        let mut transactions = full_scan();
        transactions.extend(select(0));
        transactions.extend(select(1));
        let mut i2c = I2cMock::new(&transactions);
        let sensor = FakeSensor::default();
        sensor.script_probes(&[true, true, false, false, false, false, false, false]);
        sensor.script_reads(&[Ok(500), Ok(2000)]);
        let mux = SensorMux::new(i2c.clone(), NoopDelay, sensor, MUX_ADDRESS);

        let shared = shared_staircase();
        let diag = DiagChannel::new();
        let mut task = SensorTask::new(mux, PulseCounter::default(), &shared, diag.sender());

        let result = task.poll(Instant::from_millis(0));
        assert!(!result.recovered);
        assert_eq!(result.next_deadline, Instant::from_millis(20));

        let receiver = diag.receiver();
        assert_eq!(receiver.take(), Some(DiagEvent::Connected { segment: 0 }));
        assert_eq!(receiver.take(), Some(DiagEvent::Connected { segment: 1 }));
        assert_eq!(
            receiver.take(),
            Some(DiagEvent::Triggered {
                segment: 0,
                distance_mm: 500
            })
        );
        // Segment 0 is the mode selector, so the trigger also advanced the
        // mode.
        assert_eq!(
            receiver.take(),
            Some(DiagEvent::ModeChanged {
                mode: ModeId::CascadeFade
            })
        );
        assert_eq!(receiver.take(), None);
        assert_eq!(shared.mode(), ModeId::CascadeFade);

        i2c.done();
    }

    #[test]
    fn test_sense_task_escalates_to_bus_recovery() {
        let mut transactions = full_scan();
        // Poll 1: both segments exhaust their retries.
        transactions.extend((0..3).flat_map(|_| select(0)));
        transactions.extend((0..3).flat_map(|_| select(1)));
        // Poll 2: same again.
        transactions.extend((0..3).flat_map(|_| select(0)));
        transactions.extend((0..3).flat_map(|_| select(1)));
        // Poll 3: segment 0 fails once more, tripping the bus-wide limit;
        // the pass stops before touching segment 1.
        transactions.extend((0..3).flat_map(|_| select(0)));
        // Poll 4: recovery re-scan, then both sensors answer again.
        transactions.extend(full_scan());
        transactions.extend(select(0));
        transactions.extend(select(1));

        let mut i2c = I2cMock::new(&transactions);
        let sensor = FakeSensor::default();
        sensor.script_probes(&[true, true, false, false, false, false, false, false]);
        sensor.script_reads(&[Err(SensorFault::Timeout); 15]);
        sensor.script_probes(&[true, true, false, false, false, false, false, false]);
        sensor.script_reads(&[Ok(400), Ok(2000)]);
        let mux = SensorMux::new(i2c.clone(), NoopDelay, sensor, MUX_ADDRESS);

        let shared = shared_staircase();
        let diag = DiagChannel::new();
        let unstick = PulseCounter::default();
        let mut task = SensorTask::new(mux, unstick.clone(), &shared, diag.sender());

        assert!(!task.poll(Instant::from_millis(0)).recovered);
        assert!(!task.poll(Instant::from_millis(20)).recovered);
        assert!(!task.poll(Instant::from_millis(40)).recovered);
        assert!(task.poll(Instant::from_millis(60)).recovered);

        assert_eq!(*unstick.pulses.borrow(), vec![9]);

        let receiver = diag.receiver();
        assert_eq!(receiver.take(), Some(DiagEvent::Connected { segment: 0 }));
        assert_eq!(receiver.take(), Some(DiagEvent::Connected { segment: 1 }));
        // Poll 3: segment 0 hit its per-channel failure limit.
        assert_eq!(
            receiver.take(),
            Some(DiagEvent::Disconnected { segment: 0 })
        );
        // Poll 4: one recovery pass, then the rediscovered sensor triggers.
        assert_eq!(receiver.take(), Some(DiagEvent::BusRecovered { channels: 2 }));
        assert_eq!(receiver.take(), Some(DiagEvent::Connected { segment: 0 }));
        assert_eq!(
            receiver.take(),
            Some(DiagEvent::Triggered {
                segment: 0,
                distance_mm: 400
            })
        );
        assert_eq!(
            receiver.take(),
            Some(DiagEvent::ModeChanged {
                mode: ModeId::CascadeFade
            })
        );
        assert_eq!(receiver.take(), None);

        i2c.done();
    }

    #[test]
    fn test_sense_task_custom_cadence() {
        let mut i2c = I2cMock::new(&full_scan());
        let sensor = FakeSensor::default();
        // Nothing answers; the task keeps its schedule anyway.
        sensor.script_probes(&[false; 8]);
        let mux = SensorMux::new(i2c.clone(), NoopDelay, sensor, MUX_ADDRESS);

        let shared = shared_staircase();
        let diag = DiagChannel::new();
        let mut task = SensorTask::new(mux, PulseCounter::default(), &shared, diag.sender())
            .with_periods(Duration::from_millis(50), Duration::from_secs(60));

        let result = task.poll(Instant::from_millis(0));
        assert_eq!(result.next_deadline, Instant::from_millis(50));
        assert_eq!(result.sleep_duration, Duration::from_millis(50));
        assert_eq!(diag.receiver().take(), None);

        i2c.done();
    }
}
