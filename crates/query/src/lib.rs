pub mod answer;
pub mod context;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod resolver;

pub use answer::AnswerGenerator;
pub use context::ContextAssembler;
pub use error::{GenerationError, QueryError, RetrievalError};
pub use events::{ChannelSink, EventSink, NullSink, QueryEvent};
pub use pipeline::{QueryConfig, QueryOutcome, QueryPipeline};
pub use resolver::{cosine_similarity, QueryResolver, ResolvedMatch};
