//! Actuator identifiers, level snapshots, and the output-driving store.

/// One of the four controllable digital outputs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActuatorId {
    Red,
    Green,
    Blue,
    Buzzer,
}

impl ActuatorId {
    pub const COUNT: usize = 4;
    pub const ALL: [ActuatorId; Self::COUNT] = [Self::Red, Self::Green, Self::Blue, Self::Buzzer];

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Red => 0,
            Self::Green => 1,
            Self::Blue => 2,
            Self::Buzzer => 3,
        }
    }

    /// Query-string key this actuator answers to.
    pub const fn query_key(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Buzzer => "buzzer",
        }
    }

    /// Human-readable name used in the rendered panel.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Red => "Red LED",
            Self::Green => "Green LED",
            Self::Blue => "Blue LED",
            Self::Buzzer => "Buzzer",
        }
    }
}

/// Level of every actuator at one consistent instant.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Levels {
    bits: [bool; ActuatorId::COUNT],
}

impl Levels {
    pub const fn get(self, id: ActuatorId) -> bool {
        self.bits[id.index()]
    }

    pub(crate) const fn set(&mut self, id: ActuatorId, level: bool) {
        self.bits[id.index()] = level;
    }
}

/// "Set digital output level" collaborator seam. Driving a push-pull GPIO is
/// infallible on the targeted hardware, so the contract carries no error.
pub trait OutputPort {
    fn set_level(&mut self, id: ActuatorId, level: bool);
}

/// Authoritative actuator state. Every write also drives the physical port;
/// reads always return the last write, whichever path it came from.
pub struct ActuatorStore<P: OutputPort> {
    levels: Levels,
    port: P,
}

impl<P: OutputPort> ActuatorStore<P> {
    /// All levels start low, and the port is driven low to match.
    pub fn new(mut port: P) -> Self {
        for id in ActuatorId::ALL {
            port.set_level(id, false);
        }
        Self {
            levels: Levels::default(),
            port,
        }
    }

    pub fn set(&mut self, id: ActuatorId, level: bool) {
        self.levels.set(id, level);
        self.port.set_level(id, level);
    }

    pub fn get(&self, id: ActuatorId) -> bool {
        self.levels.get(id)
    }

    pub fn snapshot(&self) -> Levels {
        self.levels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakePort {
        writes: heapless::Vec<(ActuatorId, bool), 16>,
    }

    impl OutputPort for FakePort {
        fn set_level(&mut self, id: ActuatorId, level: bool) {
            let _ = self.writes.push((id, level));
        }
    }

    #[test]
    fn new_store_drives_every_line_low() {
        let store = ActuatorStore::new(FakePort::default());
        assert_eq!(store.port.writes.len(), ActuatorId::COUNT);
        assert!(store.port.writes.iter().all(|&(_, level)| !level));
        assert_eq!(store.snapshot(), Levels::default());
    }

    #[test]
    fn reads_return_the_last_write() {
        let mut store = ActuatorStore::new(FakePort::default());
        store.set(ActuatorId::Blue, true);
        assert!(store.get(ActuatorId::Blue));
        store.set(ActuatorId::Blue, false);
        assert!(!store.get(ActuatorId::Blue));
        assert_eq!(
            store.port.writes.last(),
            Some(&(ActuatorId::Blue, false))
        );
    }

    #[test]
    fn snapshot_reflects_one_instant() {
        let mut store = ActuatorStore::new(FakePort::default());
        store.set(ActuatorId::Red, true);
        store.set(ActuatorId::Buzzer, true);
        let snap = store.snapshot();
        store.set(ActuatorId::Red, false);
        assert!(snap.get(ActuatorId::Red));
        assert!(snap.get(ActuatorId::Buzzer));
        assert!(!snap.get(ActuatorId::Green));
    }
}
