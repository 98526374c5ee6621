use crate::task::Failure;
use std::fmt;
use std::mem;

/// Holds the outcome of a frame until it is consumed exactly once.
///
/// The cell is filled at most once (with a value or a captured failure) and
/// taken at most once. `ResultCell<()>` is the no-value case.
pub struct ResultCell<T> {
    stage: Stage<T>,
}

enum Stage<T> {
    Empty,
    Value(T),
    Failed(Failure),
    Consumed,
}

/// Reasons a [`ResultCell`] could not hand out a value.
#[derive(thiserror::Error, Debug)]
pub enum CellError {
    #[error("cell is empty")]
    Empty,

    #[error("cell was already consumed")]
    Consumed,

    #[error("cell holds a failure: {0}")]
    Failed(Failure),
}

impl<T> ResultCell<T> {
    pub const fn new() -> Self {
        Self {
            stage: Stage::Empty,
        }
    }

    /// True if a value or failure is stored and not yet taken.
    pub fn is_filled(&self) -> bool {
        matches!(self.stage, Stage::Value(_) | Stage::Failed(_))
    }

    pub fn is_consumed(&self) -> bool {
        matches!(self.stage, Stage::Consumed)
    }

    /// Store a value. A cell that was already filled or consumed refuses it
    /// and hands it back.
    pub fn put_value(&mut self, value: T) -> Result<(), T> {
        match self.stage {
            Stage::Empty => {
                self.stage = Stage::Value(value);
                Ok(())
            }
            _ => Err(value),
        }
    }

    pub fn put_failure(&mut self, failure: Failure) -> Result<(), Failure> {
        match self.stage {
            Stage::Empty => {
                self.stage = Stage::Failed(failure);
                Ok(())
            }
            _ => Err(failure),
        }
    }

    /// Destructive read. Once a value or failure has been taken the cell is
    /// consumed and every later take fails with [`CellError::Consumed`].
    pub fn take(&mut self) -> Result<T, CellError> {
        match mem::replace(&mut self.stage, Stage::Consumed) {
            Stage::Value(value) => Ok(value),
            Stage::Failed(failure) => Err(CellError::Failed(failure)),
            Stage::Empty => {
                self.stage = Stage::Empty;
                Err(CellError::Empty)
            }
            Stage::Consumed => Err(CellError::Consumed),
        }
    }
}

impl<T> Default for ResultCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResultCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match &self.stage {
            Stage::Empty => "Empty",
            Stage::Value(_) => "Value",
            Stage::Failed(_) => "Failed",
            Stage::Consumed => "Consumed",
        };

        f.debug_struct("ResultCell").field("stage", &stage).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::failure;

    #[test]
    fn test_value_round_trip() {
        let mut cell = ResultCell::new();
        assert!(!cell.is_filled());

        cell.put_value(String::from("hello")).unwrap();
        assert!(cell.is_filled());

        assert_eq!(cell.take().unwrap(), "hello");
        assert!(cell.is_consumed());
        assert!(matches!(cell.take(), Err(CellError::Consumed)));
    }

    #[test]
    fn test_unit_cell() {
        let mut cell = ResultCell::<()>::default();
        cell.put_value(()).unwrap();
        cell.take().unwrap();
    }

    #[test]
    fn test_take_empty_keeps_cell_usable() {
        let mut cell = ResultCell::new();
        assert!(matches!(cell.take(), Err(CellError::Empty)));
        assert!(!cell.is_consumed());

        cell.put_value(3).unwrap();
        assert_eq!(cell.take().unwrap(), 3);
    }

    #[test]
    fn test_second_put_refused() {
        let mut cell = ResultCell::new();
        cell.put_value(1).unwrap();

        assert_eq!(cell.put_value(2), Err(2));
        let refused = cell.put_failure(failure("late")).unwrap_err();
        assert_eq!(refused.message(), Some("late"));

        assert_eq!(cell.take().unwrap(), 1);
        assert_eq!(cell.put_value(3), Err(3));
    }

    #[test]
    fn test_failure_is_surfaced_once() {
        let mut cell = ResultCell::<u32>::new();
        cell.put_failure(failure("boom")).unwrap();

        match cell.take() {
            Err(CellError::Failed(f)) => assert_eq!(f.message(), Some("boom")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(cell.take(), Err(CellError::Consumed)));
    }
}
