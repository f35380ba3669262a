//! Board core: pure date logic, row schemas and the pagination state machine.
mod boards;
mod clock;
mod horizon;
mod record;
mod resolve;
mod rows;
mod sequence;
mod signal;
mod walk;

pub use boards::{
    BoardNoticeRow, EventBoardRow, ExpoRow, NewsRow, OnlineReceptionRow, ReserveProgramRow,
    WarakCardRow, CLOSED_LABEL,
};
pub use clock::{first_of_month, months_before, Clock, FixedClock, SystemClock};
pub use horizon::{is_retained, Horizon, RetentionPolicy};
pub use record::{Anchor, DecodedRow, RawCell, RawRow, Record};
pub use resolve::{resolve, DateError, ResolvedDate, RolloverRule, YearContext};
pub use rows::{absolute_url, RowDecoder};
pub use sequence::SequenceYearResolver;
pub use signal::{extract_signals, select_signal, DateSignal, SignalFormat};
pub use walk::{
    RowVerdict, Step, TerminationPolicy, TerminationReason, WalkOutcome, WalkPlan, WalkState,
    WalkSummary, YearInference, DEFAULT_MAX_CONSECUTIVE_FAILURES,
};
