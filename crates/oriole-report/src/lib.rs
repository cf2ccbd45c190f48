//! Report assembly.
//!
//! Pure construction of the outbound report envelope. Assembly checks
//! that the collected reports cover exactly the assigned external ids; a
//! mismatch is a correctness bug upstream, never an expected runtime
//! condition, and comes back as an error instead of a wrong report.

mod assembler;

pub use assembler::{AssembleError, ReportAssembler};
