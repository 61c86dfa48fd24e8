/// Runtime representation of a value.
///
/// Wasm code manipulates values of several basic value types; the core
/// subset implemented here only carries 32-bit integers. The type is kept
/// as an enum (rather than a raw `u32` plus a separate tag) so that every
/// value on the stack is self-describing and mismatched-type pops are a
/// catchable logic error instead of a reinterpreted bit pattern.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// Value of a 32-bit signed or unsigned integer, interpreted by each
    /// operation as either, in two's-complement representation.
    I32(i32),
}

impl Value {
    /// The [`ValueType`](crate::types::ValueType) tag of this value.
    pub fn value_type(&self) -> crate::types::ValueType {
        match self {
            Value::I32(_) => crate::types::ValueType::I32,
        }
    }

    /// Returns the inner `i32`.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not [`Value::I32`]. Core only has one value
    /// type, so this can't currently happen from well-typed code, but the
    /// check exists to fail loudly rather than silently wrap.
    pub fn as_i32(self) -> i32 {
        match self {
            Value::I32(v) => v,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}
