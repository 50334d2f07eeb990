//! Common types, errors, and value vocabularies for luabound output files

use crate::table::ParticleTable;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Header line prefixes, in file order
pub const HEADER_PREFIXES: [&str; 4] = [
    "# filename:",
    "# timestamp:",
    "# output timing:",
    "# format:",
];

/// Characters collapsed into a single skip token by the format grammar
pub const FORMAT_PUNCTUATION: &[char] = &[' ', '\t', ',', ';', ':', '.', '/', '\\'];

/// Characters separating fields on a data line.
///
/// The period is excluded: it is the decimal point of every float field.
pub const DATA_DELIMITERS: &[char] = &[' ', '\t', ',', ';', ':', '/', '\\'];

/// Prefix required on vector-valued data fields
pub const VECTOR_PREFIX: &str = "{{";

/// Separator between the components of a vector-valued data field
pub const VECTOR_SEPARATOR: char = '|';

// ============================================================================
// Error Types
// ============================================================================

/// Error type for loading and indexing luabound output files.
///
/// Load errors (header, format and body) abort the whole load. View errors
/// (`UnknownTag`, `TypeMismatch`, `InvalidKeyType`, `IndexOutOfRange`) are
/// raised at the point of access and leave the table untouched.
#[derive(Debug, Error)]
pub enum LbdError {
    #[error("the file {0:?} could not be found")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("the file is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("the file does not have enough lines")]
    TooFewLines,

    #[error("the file has a malformed header")]
    MalformedHeader,

    #[error("header line {0} is malformed")]
    MalformedHeaderLine(usize),

    #[error("the output timing header entry is not a float")]
    InvalidTimingValue,

    #[error("invalid format string input at {0}")]
    InvalidFormatCharacter(usize),

    #[error("invalid value token at {0}")]
    InvalidToken(usize),

    #[error("reached end of format string with an open list")]
    UnterminatedList,

    #[error("cannot specify a list inside a list")]
    NestedListNotAllowed,

    #[error("data line {0} did not have an integer particle count")]
    NonIntegerParticleCount(usize),

    #[error("data line {line} has {found} fields, expected {expected}")]
    FieldCountMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid vector value in data line {0}")]
    MalformedVector(usize),

    #[error("invalid number in data line {0}")]
    InvalidNumber(usize),

    #[error("the tag {0:?} is not in the tag map")]
    UnknownTag(String),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("the key type is not supported by this view")]
    InvalidKeyType,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

impl LbdError {
    /// Whether this error was produced while loading, as opposed to while
    /// indexing an already loaded table.
    pub fn is_load_error(&self) -> bool {
        !matches!(
            self,
            LbdError::UnknownTag(_)
                | LbdError::TypeMismatch { .. }
                | LbdError::InvalidKeyType
                | LbdError::IndexOutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LbdError>;

// ============================================================================
// Value Vocabulary
// ============================================================================

/// Storage type of a decoded value, fixed by its code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDataType {
    String,
    Float,
    Vector,
}

/// The group a value token belongs to (the character after `#`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Simulation-wide value (`s`)
    Simulation,
    /// Current value of a single particle (`p`)
    Particle,
    /// Standard deviation across all particles (`d`)
    StdDev,
    /// Average across all particles (`a`)
    Average,
}

impl ValueKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            's' => Some(ValueKind::Simulation),
            'p' => Some(ValueKind::Particle),
            'd' => Some(ValueKind::StdDev),
            'a' => Some(ValueKind::Average),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            ValueKind::Simulation => 's',
            ValueKind::Particle => 'p',
            ValueKind::StdDev => 'd',
            ValueKind::Average => 'a',
        }
    }

    /// Look up `code` in the vocabulary this kind validates against
    pub fn lookup(self, code: &str) -> Option<ValueCode> {
        match self {
            ValueKind::Simulation => SimValue::from_code(code).map(ValueCode::Sim),
            _ => ParticleValue::from_code(code).map(ValueCode::Particle),
        }
    }
}

/// Simulation-level value codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimValue {
    Name,
    Time,
    LastDt,
    ParticleCount,
    Integrator,
    Gravity,
    TimeStep,
    WallTime,
    WallResolution,
}

impl SimValue {
    pub const ALL: [SimValue; 9] = [
        SimValue::Name,
        SimValue::Time,
        SimValue::LastDt,
        SimValue::ParticleCount,
        SimValue::Integrator,
        SimValue::Gravity,
        SimValue::TimeStep,
        SimValue::WallTime,
        SimValue::WallResolution,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            SimValue::Name => "n",
            SimValue::Time => "t",
            SimValue::LastDt => "dt",
            SimValue::ParticleCount => "c",
            SimValue::Integrator => "i",
            SimValue::Gravity => "G",
            SimValue::TimeStep => "ts",
            SimValue::WallTime => "w",
            SimValue::WallResolution => "wr",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SimValue::Name => "simulation name",
            SimValue::Time => "simulation time",
            SimValue::LastDt => "last timestep size",
            SimValue::ParticleCount => "particle count",
            SimValue::Integrator => "integrator name",
            SimValue::Gravity => "gravitational constant",
            SimValue::TimeStep => "timestep index",
            SimValue::WallTime => "wall time since start",
            SimValue::WallResolution => "wall timer resolution",
        }
    }

    pub fn data_type(self) -> ValueDataType {
        match self {
            SimValue::Name | SimValue::Integrator => ValueDataType::String,
            _ => ValueDataType::Float,
        }
    }
}

/// Particle-level value codes, shared by the `p`, `d` and `a` kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleValue {
    Mass,
    Radius,
    Name,
    Hash,
    SemiMajorAxis,
    Eccentricity,
    Inclination,
    AscendingNode,
    Pericenter,
    TrueAnomaly,
    MeanAnomaly,
    PosX,
    PosY,
    PosZ,
    VelX,
    VelY,
    VelZ,
    AccX,
    AccY,
    AccZ,
    Distance,
    PrimaryDistance,
    EccX,
    EccY,
    EccZ,
    EccVector,
    AngularMomentum,
    AngMomX,
    AngMomY,
    AngMomZ,
    AngMomVector,
}

impl ParticleValue {
    pub const ALL: [ParticleValue; 31] = [
        ParticleValue::Mass,
        ParticleValue::Radius,
        ParticleValue::Name,
        ParticleValue::Hash,
        ParticleValue::SemiMajorAxis,
        ParticleValue::Eccentricity,
        ParticleValue::Inclination,
        ParticleValue::AscendingNode,
        ParticleValue::Pericenter,
        ParticleValue::TrueAnomaly,
        ParticleValue::MeanAnomaly,
        ParticleValue::PosX,
        ParticleValue::PosY,
        ParticleValue::PosZ,
        ParticleValue::VelX,
        ParticleValue::VelY,
        ParticleValue::VelZ,
        ParticleValue::AccX,
        ParticleValue::AccY,
        ParticleValue::AccZ,
        ParticleValue::Distance,
        ParticleValue::PrimaryDistance,
        ParticleValue::EccX,
        ParticleValue::EccY,
        ParticleValue::EccZ,
        ParticleValue::EccVector,
        ParticleValue::AngularMomentum,
        ParticleValue::AngMomX,
        ParticleValue::AngMomY,
        ParticleValue::AngMomZ,
        ParticleValue::AngMomVector,
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.code() == code)
    }

    pub fn code(self) -> &'static str {
        match self {
            ParticleValue::Mass => "m",
            ParticleValue::Radius => "r",
            ParticleValue::Name => "n",
            ParticleValue::Hash => "h",
            ParticleValue::SemiMajorAxis => "a",
            ParticleValue::Eccentricity => "e",
            ParticleValue::Inclination => "i",
            ParticleValue::AscendingNode => "O",
            ParticleValue::Pericenter => "o",
            ParticleValue::TrueAnomaly => "f",
            ParticleValue::MeanAnomaly => "M",
            ParticleValue::PosX => "x",
            ParticleValue::PosY => "y",
            ParticleValue::PosZ => "z",
            ParticleValue::VelX => "vx",
            ParticleValue::VelY => "vy",
            ParticleValue::VelZ => "vz",
            ParticleValue::AccX => "ax",
            ParticleValue::AccY => "ay",
            ParticleValue::AccZ => "az",
            ParticleValue::Distance => "R",
            ParticleValue::PrimaryDistance => "Rc",
            ParticleValue::EccX => "ex",
            ParticleValue::EccY => "ey",
            ParticleValue::EccZ => "ez",
            ParticleValue::EccVector => "ev",
            ParticleValue::AngularMomentum => "j",
            ParticleValue::AngMomX => "jx",
            ParticleValue::AngMomY => "jy",
            ParticleValue::AngMomZ => "jz",
            ParticleValue::AngMomVector => "jv",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ParticleValue::Mass => "mass",
            ParticleValue::Radius => "radius",
            ParticleValue::Name => "name",
            ParticleValue::Hash => "hash",
            ParticleValue::SemiMajorAxis => "semi-major axis",
            ParticleValue::Eccentricity => "eccentricity",
            ParticleValue::Inclination => "inclination",
            ParticleValue::AscendingNode => "longitude of ascending node",
            ParticleValue::Pericenter => "argument of pericenter",
            ParticleValue::TrueAnomaly => "true anomaly",
            ParticleValue::MeanAnomaly => "mean anomaly",
            ParticleValue::PosX => "X position",
            ParticleValue::PosY => "Y position",
            ParticleValue::PosZ => "Z position",
            ParticleValue::VelX => "X velocity",
            ParticleValue::VelY => "Y velocity",
            ParticleValue::VelZ => "Z velocity",
            ParticleValue::AccX => "X acceleration",
            ParticleValue::AccY => "Y acceleration",
            ParticleValue::AccZ => "Z acceleration",
            ParticleValue::Distance => "distance from origin",
            ParticleValue::PrimaryDistance => "distance from primary",
            ParticleValue::EccX => "X eccentricity",
            ParticleValue::EccY => "Y eccentricity",
            ParticleValue::EccZ => "Z eccentricity",
            ParticleValue::EccVector => "eccentricity vector",
            ParticleValue::AngularMomentum => "angular momentum",
            ParticleValue::AngMomX => "X angular momentum",
            ParticleValue::AngMomY => "Y angular momentum",
            ParticleValue::AngMomZ => "Z angular momentum",
            ParticleValue::AngMomVector => "angular momentum vector",
        }
    }

    pub fn data_type(self) -> ValueDataType {
        match self {
            ParticleValue::Name | ParticleValue::Inclination => ValueDataType::String,
            ParticleValue::EccVector | ParticleValue::AngMomVector => ValueDataType::Vector,
            _ => ValueDataType::Float,
        }
    }
}

/// A validated value code, tied to the vocabulary it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueCode {
    Sim(SimValue),
    Particle(ParticleValue),
}

impl ValueCode {
    pub fn code(self) -> &'static str {
        match self {
            ValueCode::Sim(v) => v.code(),
            ValueCode::Particle(v) => v.code(),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ValueCode::Sim(v) => v.description(),
            ValueCode::Particle(v) => v.description(),
        }
    }

    pub fn data_type(self) -> ValueDataType {
        match self {
            ValueCode::Sim(v) => v.data_type(),
            ValueCode::Particle(v) => v.data_type(),
        }
    }
}

// ============================================================================
// Cell Data
// ============================================================================

/// A 3-component vector value
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Vector component selector for the `x`/`y`/`z` view accessors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Vector3 {
    #[inline]
    pub fn component(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// One decoded value of the table
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Float(f64),
    Str(String),
    Vector(Vector3),
    Particles(ParticleTable),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vector3> {
        match self {
            Cell::Vector(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_particles(&self) -> Option<&ParticleTable> {
        match self {
            Cell::Particles(p) => Some(p),
            _ => None,
        }
    }

    /// Name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Float(_) => "float",
            Cell::Str(_) => "string",
            Cell::Vector(_) => "vector",
            Cell::Particles(_) => "list",
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Str(s) => write!(f, "{}", s),
            Cell::Vector(v) => write!(f, "{{{{{}|{}|{}}}}}", v.x, v.y, v.z),
            Cell::Particles(p) => write!(f, "<list of {} particles>", p.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_codes_round_trip() {
        for v in SimValue::ALL {
            assert_eq!(SimValue::from_code(v.code()), Some(v));
        }
        for v in ParticleValue::ALL {
            assert_eq!(ParticleValue::from_code(v.code()), Some(v));
        }
        assert_eq!(SimValue::from_code("vx"), None);
        assert_eq!(ParticleValue::from_code("wr"), None);
    }

    #[test]
    fn test_data_types() {
        assert_eq!(SimValue::Name.data_type(), ValueDataType::String);
        assert_eq!(SimValue::Integrator.data_type(), ValueDataType::String);
        assert_eq!(SimValue::Time.data_type(), ValueDataType::Float);
        assert_eq!(ParticleValue::Name.data_type(), ValueDataType::String);
        assert_eq!(ParticleValue::EccVector.data_type(), ValueDataType::Vector);
        assert_eq!(ParticleValue::AngMomVector.data_type(), ValueDataType::Vector);
        assert_eq!(ParticleValue::Mass.data_type(), ValueDataType::Float);
    }

    #[test]
    fn test_kind_lookup_uses_its_vocabulary() {
        assert_eq!(
            ValueKind::Simulation.lookup("dt"),
            Some(ValueCode::Sim(SimValue::LastDt))
        );
        assert_eq!(ValueKind::Simulation.lookup("m"), None);
        assert_eq!(
            ValueKind::Average.lookup("m"),
            Some(ValueCode::Particle(ParticleValue::Mass))
        );
        assert_eq!(ValueKind::from_char('q'), None);
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Vector(Vector3::new(1.0, 2.0, 3.0)).to_string(), "{{1|2|3}}");
        assert_eq!(Cell::Str("earth".into()).to_string(), "earth");
    }

    #[test]
    fn test_load_error_classification() {
        assert!(LbdError::TooFewLines.is_load_error());
        assert!(LbdError::InvalidNumber(3).is_load_error());
        assert!(!LbdError::UnknownTag("pm".into()).is_load_error());
        assert!(!LbdError::InvalidKeyType.is_load_error());
    }
}
