//! Solving-session options: backend selection and quantitative bounds.
//!
//! Options are plain data resolved before circuit construction starts; the
//! factory consumes `max_primary_variable` and the optional weight ceiling,
//! the backend driver consumes the rest.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Error raised while resolving solver options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    /// A solver name that maps to no supported backend.
    #[error("unsupported solver: {0}")]
    UnsupportedSolver(String),
}

/// The SMT backend used to solve the finished circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Solver {
    /// CVC4, the default backend.
    Cvc4,
    /// Z3.
    Z3,
    /// MathSAT.
    MathSat,
    /// Yices 2.
    Yices,
}

impl Solver {
    /// All supported backends, in preference order.
    pub fn all() -> &'static [Solver] {
        &[Solver::Cvc4, Solver::Z3, Solver::MathSat, Solver::Yices]
    }

    /// True when the backend ships an executable we can drive. Every
    /// supported backend currently does; the hook exists for library-only
    /// integrations.
    pub fn has_binary(self) -> bool {
        true
    }

    /// True when the backend supports incremental (push/pop) solving.
    pub fn can_be_incremental(self) -> bool {
        true
    }
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Solver::Cvc4 => "cvc4",
            Solver::Z3 => "z3",
            Solver::MathSat => "mathsat",
            Solver::Yices => "yices",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Solver {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cvc4" => Ok(Solver::Cvc4),
            "z3" => Ok(Solver::Z3),
            "mathsat" => Ok(Solver::MathSat),
            "yices" => Ok(Solver::Yices),
            other => Err(OptionsError::UnsupportedSolver(other.to_string())),
        }
    }
}

/// Options for one quantitative solving session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOptions {
    solver: Solver,
    binary_location: Option<PathBuf>,
    maximum_weight: Option<i64>,
    incremental: bool,
    max_primary_variable: u32,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            solver: Solver::Cvc4,
            binary_location: None,
            maximum_weight: None,
            incremental: false,
            max_primary_variable: 0,
        }
    }
}

impl SolveOptions {
    /// Options with the default backend and no quantitative bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected backend.
    pub fn solver(&self) -> Solver {
        self.solver
    }

    /// Select a backend. Incremental mode is re-resolved against the new
    /// backend's capability.
    pub fn set_solver(&mut self, solver: Solver) {
        self.solver = solver;
        self.incremental = self.incremental && solver.can_be_incremental();
    }

    /// Explicit path to the backend executable, when not taken from `PATH`.
    pub fn binary_location(&self) -> Option<&PathBuf> {
        self.binary_location.as_ref()
    }

    /// Point at a specific backend executable.
    pub fn set_binary_location(&mut self, path: PathBuf) {
        self.binary_location = Some(path);
    }

    /// The weight ceiling, when one is set and non-negative.
    pub fn maximum_weight(&self) -> Option<i64> {
        match self.maximum_weight {
            Some(w) if w >= 0 => Some(w),
            _ => None,
        }
    }

    /// True when a usable (non-negative) weight ceiling is set.
    pub fn has_maximum_weight(&self) -> bool {
        self.maximum_weight().is_some()
    }

    /// Cap every weight variable at `w`. Negative ceilings are remembered
    /// but read back as absent.
    pub fn set_maximum_weight(&mut self, w: i64) {
        self.maximum_weight = Some(w);
    }

    /// True when the session should solve incrementally.
    pub fn incremental(&self) -> bool {
        self.incremental
    }

    /// Request incremental solving. Silently downgraded to one-shot when the
    /// selected backend cannot solve incrementally.
    pub fn set_incremental(&mut self, incremental: bool) {
        self.incremental = incremental && self.solver.can_be_incremental();
    }

    /// The highest primary variable label of the session's circuit.
    pub fn max_primary_variable(&self) -> u32 {
        self.max_primary_variable
    }

    /// Record the circuit's primary variable watermark.
    pub fn set_max_primary_variable(&mut self, max: u32) {
        self.max_primary_variable = max;
    }
}

impl fmt::Display for SolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "solver: {}, incremental: {}, max weight: ",
            self.solver, self.incremental
        )?;
        match self.maximum_weight() {
            Some(w) => write!(f, "{}", w)?,
            None => write!(f, "none")?,
        }
        if let Some(p) = &self.binary_location {
            write!(f, ", binary: {}", p.display())?;
        }
        Ok(())
    }
}
