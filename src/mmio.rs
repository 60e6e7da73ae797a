//! Typed access to memory-mapped device register windows

/// Read/write access to one window of device register space.
///
/// Every call is a single volatile 32-bit access against live hardware at the
/// instant of invocation; implementations must not cache, batch, reorder, or
/// elide accesses. Offsets are bytes from the window base and come only from
/// the fixed maps in [`crate::regs`], which are checked against the window
/// spans when the windows are created, so implementations do not range-check
/// every access.
pub trait RegisterPort {
    fn read(&mut self, offset: usize) -> u32;
    fn write(&mut self, offset: usize, value: u32);
}

impl<P: RegisterPort + ?Sized> RegisterPort for &mut P {
    fn read(&mut self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::RegisterPort;

    /// Scriptable stand-in for a register window. Writes are recorded in
    /// order; reads are served from per-offset scripts, repeating the last
    /// scripted value once the script runs out. Unscripted offsets read 0.
    #[derive(Default)]
    pub(crate) struct FakePort {
        pub(crate) writes: Vec<(usize, u32)>,
        scripts: HashMap<usize, Vec<u32>>,
        cursors: HashMap<usize, usize>,
        read_counts: HashMap<usize, usize>,
    }

    impl FakePort {
        pub(crate) fn script(&mut self, offset: usize, values: &[u32]) {
            self.scripts.insert(offset, values.to_vec());
        }

        /// Every value written to `offset`, oldest first
        pub(crate) fn written(&self, offset: usize) -> Vec<u32> {
            self.writes
                .iter()
                .filter(|(o, _)| *o == offset)
                .map(|(_, v)| *v)
                .collect()
        }

        pub(crate) fn reads_of(&self, offset: usize) -> usize {
            self.read_counts.get(&offset).copied().unwrap_or(0)
        }
    }

    impl RegisterPort for FakePort {
        fn read(&mut self, offset: usize) -> u32 {
            *self.read_counts.entry(offset).or_insert(0) += 1;
            let cursor = self.cursors.entry(offset).or_insert(0);
            match self.scripts.get(&offset) {
                Some(script) => {
                    let value = script[(*cursor).min(script.len() - 1)];
                    *cursor += 1;
                    value
                }
                None => 0,
            }
        }

        fn write(&mut self, offset: usize, value: u32) {
            self.writes.push((offset, value));
        }
    }
}
