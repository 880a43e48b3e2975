//! Storyloom Shared - wire contracts of the Turn API
//!
//! Request and response bodies exchanged between the engine's HTTP layer and
//! any client (CLI, web front end, tests).
//!
//! # Design Principles
//!
//! 1. **No business logic** - pure data types and serialization
//! 2. **No domain IDs** - identifiers travel as plain strings
//! 3. **Forward compatible** - unknown enum variants deserialize to `Unknown`

pub mod requests;
pub mod responses;

pub use requests::{ConfirmEscalationRequest, ExecuteRequest};
pub use responses::{
    CharacterResponseDto, DecisionMetadataDto, DecisionPointDto, EnvironmentStatusDto,
    ErrorCode, ErrorResponse, EscalationStatusResponse, ExecutionResultDto, HiddenDto,
    LocationStatusDto, RawResponseDto, SaveCreatedResponse, SaveStepDto, SaveStepsResponse,
    StepTimingDto, SurfaceDto, TransitionDto, TurnResponse,
};
