/*!
 * Path Sandbox
 *
 * Every file-touching operation passes through the gate first:
 * - Root registry fixed at startup, shared read-only
 * - Physical path resolution with bounded symlink expansion
 * - Segment-wise containment, never string prefixes
 * - Kind enforcement with default-extension append on create
 */

pub mod gate;
pub mod kind;
pub mod normalizer;
pub mod registry;
pub mod validator;

pub use gate::{authorize_blocking, AccessGate};
pub use kind::{ensure_extension, KindEnforcer, KindOutcome};
pub use normalizer::{LeafEntry, PathNormalizer, Resolution, ResolveError};
pub use registry::RootRegistry;
pub use validator::SandboxValidator;
