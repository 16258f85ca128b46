pub mod aggregate;
pub mod extract;

pub use aggregate::Accumulator;
pub use aggregate::CellGroup;
pub use aggregate::GroupAggregator;
pub use aggregate::PositionSet;
pub use aggregate::ReadCount;

pub use extract::aux_string;
pub use extract::molecule_key;
pub use extract::positional_key;
pub use extract::ExtractError;
pub use extract::MoleculeKey;
pub use extract::PosMoleculeKey;
pub use extract::KEY_SEPARATOR;
