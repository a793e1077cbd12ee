pub mod aggregate;
pub mod bind;
pub mod diff;
pub mod error;
pub mod fragment;
pub mod mapfile;
pub mod member;
pub mod normalize;
pub mod options;
pub mod peers;
pub mod render;
pub mod section;
pub mod settings;
pub mod validate;

pub use aggregate::{assemble_files, assemble_target, RenderedFile};
pub use bind::{sort_bind, BindEntry};
pub use diff::build_unified_diff;
pub use error::{ExitCode, RenderError, RenderResult};
pub use fragment::ConfigFragment;
pub use mapfile::{assemble_map_file, DeclaredEntry, MapFile, MapFileEntry};
pub use member::BalancerMember;
pub use normalize::{
    BindInput, BindValue, MappingItem, OneOrMany, OptionScalar, OptionValue, OptionsInput,
    OrderedPairs, PortItem, PortsInput,
};
pub use options::{merge_options, OptionEntry};
pub use peers::{Peer, PeersSection};
pub use render::{Declarations, RenderOutput, Renderer};
pub use section::{
    DefaultsSection, GlobalSection, ListenerParams, ProxySection, SectionKind, SectionParams,
};
pub use settings::RenderSettings;
pub use validate::{validate_address_or_host, validate_port};
