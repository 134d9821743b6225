pub mod duration_secs;
pub mod error;
pub mod ids;
pub mod request;
pub mod response;
pub mod tool_detection;

pub use error::{RouterError, VendorError};
pub use ids::{ModelId, RequestId, VendorId};
pub use request::{AlsContext, GroundingMode, Message, Request, Role};
pub use response::{Citation, CitationSource, CitationType, Response, ResponseMeta, Usage};
pub use tool_detection::{
    AttestationResult, OpenAiDetection, VendorDetection, VertexDetection, attest_two_step,
    detect_openai_websearch_usage, detect_vertex_grounding_usage, extract_vertex_sources,
    normalize_tool_detection,
};
