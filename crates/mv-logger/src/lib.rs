pub mod post_run;
pub mod transcript;

pub use post_run::PostRunWriter;
pub use transcript::TranscriptWriter;
