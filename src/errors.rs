use thiserror::Error;

/// Library-wide error type - single point of truth
///
/// Every failure in this crate is synchronous and deterministic; nothing here
/// is transient I/O, so there is no retry machinery. The caller corrects its
/// inputs and retries with a fresh encoder instance.
#[derive(Error, Debug)]
pub enum AssetError {
    /// Malformed content references, disallowed rule combinations,
    /// unsupported currencies, bad output amounts
    #[error("Validation error: {0}")]
    Validation(String),

    /// Hard size limits of the binary instruction format
    #[error("Capacity error: {0}")]
    Capacity(#[from] CapacityError),

    /// Gas, dust, royalty and asset-balance accounting failures
    #[error("Economics error: {0}")]
    Economics(String),

    /// Encoder lifecycle misuse (building twice, reading results too early)
    #[error("State error: {0}")]
    State(String),

    /// Opaque failure from the delegated signing engine
    #[error("Signer error: {0}")]
    Signer(String),
}

/// Capacity limits of the binary instruction format
#[derive(Error, Debug)]
pub enum CapacityError {
    /// Fixed-width bit field cannot hold the value
    #[error("Value {value} does not fit in {width} bits")]
    FieldOverflow { value: u64, width: u32 },

    /// Value outside the precision-encodable range [0, 2^54 - 1]
    #[error("Value {0} is outside the precision-encodable range")]
    PrecisionRange(u64),

    /// Packed instruction exceeds the data-output embedding ceiling
    #[error("Instruction payload is {0} bytes, limit is 80")]
    PayloadTooLarge(usize),

    /// More asset outputs than the 5-bit index field can address
    #[error("Too many asset outputs: {count}, maximum is {max}")]
    TooManyOutputs { count: usize, max: usize },
}

/// Library-wide result type - single point of truth
pub type AssetResult<T> = Result<T, AssetError>;
