//! Bounded discrete-log recovery of small plaintexts from `m·G`.

use crate::*;
use std::collections::HashMap;
use tracing::debug;

/// Tables are reserved up front only up to this many entries and grow on demand past it
const MAX_RESERVED: usize = 1 << 20;

/// A strategy for recovering `m` from `m·G` where `m` is known to lie in `[0, max_value]`
pub trait DiscreteLog {
    /// Largest plaintext this solver will search for
    fn max_value(&self) -> u64;

    /// Find `m` with `m·G == point`, or `Error::DLogNotFound` if it is outside the bound
    fn solve(&self, point: &Point) -> Result<u64, Error>;
}

/// Baby-step giant-step search.
///
/// Holds `⌊√max_value⌋ + 1` baby steps in memory and performs at most that many giant steps
/// plus one, so both memory and time are `O(√max_value)`.
#[derive(Clone, Debug)]
pub struct BabyStepGiantStep {
    max_value: u64,
    step_size: u64,
    baby_steps: HashMap<Point, u64>,
    giant_step: Point,
}

impl BabyStepGiantStep {
    pub fn new(max_value: u64) -> Self {
        let step_size = integer_sqrt(max_value) + 1;

        let mut baby_steps = HashMap::with_capacity(reserved(step_size));
        let generator = Point::generator();
        let mut current = Point::identity();
        for j in 0..step_size {
            baby_steps.insert(current, j);
            current = current + generator;
        }

        let giant_step = generator.mul_u64(step_size).neg();

        debug!(max_value, step_size, "built baby-step giant-step table");

        BabyStepGiantStep {
            max_value,
            step_size,
            baby_steps,
            giant_step,
        }
    }
}

impl DiscreteLog for BabyStepGiantStep {
    fn max_value(&self) -> u64 {
        self.max_value
    }

    fn solve(&self, point: &Point) -> Result<u64, Error> {
        if point.is_identity() {
            return Ok(0);
        }

        let mut current = *point;
        for i in 0..=self.step_size {
            if let Some(j) = self.baby_steps.get(&current) {
                let m = i
                    .checked_mul(self.step_size)
                    .and_then(|giant| giant.checked_add(*j));
                if let Some(m) = m.filter(|m| *m <= self.max_value) {
                    return Ok(m);
                }
            }
            current = current + self.giant_step;
        }

        Err(Error::DLogNotFound {
            max_value: self.max_value,
        })
    }
}

/// Fully precomputed table `j·G → j` for every `j` in `[0, max_value]`
#[derive(Clone, Debug)]
pub struct LookupTable {
    max_value: u64,
    table: HashMap<Point, u64>,
}

impl LookupTable {
    pub fn new(max_value: u64) -> Self {
        let generator = Point::generator();
        let mut table = HashMap::with_capacity(reserved(max_value.saturating_add(1)));
        let mut current = Point::identity();
        for j in 0..=max_value {
            table.insert(current, j);
            current = current + generator;
        }

        debug!(max_value, "built discrete-log lookup table");

        LookupTable { max_value, table }
    }
}

impl DiscreteLog for LookupTable {
    fn max_value(&self) -> u64 {
        self.max_value
    }

    fn solve(&self, point: &Point) -> Result<u64, Error> {
        self.table
            .get(point)
            .copied()
            .ok_or(Error::DLogNotFound {
                max_value: self.max_value,
            })
    }
}

fn reserved(entries: u64) -> usize {
    usize::try_from(entries).map_or(MAX_RESERVED, |n| n.min(MAX_RESERVED))
}

/// `⌊√n⌋` for the whole `u64` range
fn integer_sqrt(n: u64) -> u64 {
    // The f64 estimate can land one above 2^32 - 1 for n near u64::MAX
    let mut root = ((n as f64).sqrt() as u64).min(u32::MAX as u64);
    while root * root > n {
        root -= 1;
    }
    while (root + 1)
        .checked_mul(root + 1)
        .map_or(false, |square| square <= n)
    {
        root += 1;
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bsgs_recovers_small_values() {
        let solver = BabyStepGiantStep::new(1000);
        for m in [0u64, 1, 2, 31, 32, 33, 500, 999, 1000] {
            let point = Point::generator().mul_u64(m);
            assert_eq!(solver.solve(&point).unwrap(), m);
        }
    }

    #[test]
    fn bsgs_respects_bound() {
        let solver = BabyStepGiantStep::new(100);
        let point = Point::generator().mul_u64(101);
        assert!(matches!(
            solver.solve(&point),
            Err(Error::DLogNotFound { max_value: 100 })
        ));

        let far = Point::generator().mul_u64(1_000_000);
        assert!(solver.solve(&far).is_err());
    }

    #[test]
    fn lookup_table_agrees_with_bsgs() {
        let table = LookupTable::new(64);
        let bsgs = BabyStepGiantStep::new(64);
        for m in 0..=64u64 {
            let point = Point::generator().mul_u64(m);
            assert_eq!(table.solve(&point).unwrap(), m);
            assert_eq!(bsgs.solve(&point).unwrap(), m);
        }

        let out_of_range = Point::generator().mul_u64(65);
        assert!(matches!(
            table.solve(&out_of_range),
            Err(Error::DLogNotFound { max_value: 64 })
        ));
        assert_eq!(table.max_value(), 64);
    }

    #[test]
    fn integer_sqrt_is_floor() {
        assert_eq!(integer_sqrt(0), 0);
        assert_eq!(integer_sqrt(15), 3);
        assert_eq!(integer_sqrt(16), 4);
        assert_eq!(integer_sqrt(u32::MAX as u64), 65535);
        assert_eq!(integer_sqrt(u64::MAX), u32::MAX as u64);
        assert_eq!(integer_sqrt(u64::MAX - 1), u32::MAX as u64);
        let square = (u32::MAX as u64) * (u32::MAX as u64);
        assert_eq!(integer_sqrt(square), u32::MAX as u64);
        assert_eq!(integer_sqrt(square - 1), u32::MAX as u64 - 1);
    }

    #[test]
    fn table_reservation_is_clamped() {
        assert_eq!(reserved(0), 0);
        assert_eq!(reserved(65), 65);
        assert_eq!(reserved(u64::MAX), MAX_RESERVED);
        assert_eq!(integer_sqrt(u64::MAX) + 1, 1 << 32);
    }

    #[test]
    fn bsgs_candidate_overflow_is_a_miss() {
        // A baby step whose index would overflow `i * step + j` is skipped, not wrapped
        let mut baby_steps = HashMap::new();
        baby_steps.insert(Point::generator(), u64::MAX);
        let solver = BabyStepGiantStep {
            max_value: 10,
            step_size: 2,
            baby_steps,
            giant_step: Point::identity(),
        };
        assert!(matches!(
            solver.solve(&Point::generator()),
            Err(Error::DLogNotFound { max_value: 10 })
        ));
    }
}
