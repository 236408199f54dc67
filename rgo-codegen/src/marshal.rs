// Marshalling executor.
//
// Runs the strategy of a registered type against a boxed value heap, doing
// what the generated unpackSEXP_/packSEXP_ procedures do at call time. Used
// to check marshaller behaviour without a Go toolchain or an R session.

use std::collections::BTreeMap;

use rgo_sexp::{Heap, Rcomplex, Sexp};
use tracing::warn;

use crate::error::{CallError, CallResult};
use crate::strategy::{FieldPlan, Storage, Strategy, strategy_for};
use crate::types::{BasicKind, Type, TypeTable};
use crate::value::{Slice, Value, View};
use crate::walk::Direction;

/// Element handling shared by slice and map strategies.
enum Elem<'t> {
    /// Element read from or written to atomic storage in place.
    Basic(BasicKind, Storage),
    /// Element held in a list, converted by its own marshaller.
    Delegate(&'t Type),
}

impl Elem<'_> {
    fn storage(&self) -> Storage {
        match self {
            Elem::Basic(_, storage) => *storage,
            Elem::Delegate(_) => Storage::List,
        }
    }
}

/// Converts values of registered types between a heap and native values.
pub struct Marshaller<'a> {
    heap: &'a mut Heap,
    table: &'a TypeTable,
    advisories: Vec<String>,
}

impl<'a> Marshaller<'a> {
    pub fn new(heap: &'a mut Heap, table: &'a TypeTable) -> Self {
        Marshaller { heap, table, advisories: Vec::new() }
    }

    pub fn heap(&self) -> &Heap {
        self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        self.heap
    }

    /// Non-fatal conditions raised while decoding.
    pub fn advisories(&self) -> &[String] {
        &self.advisories
    }

    fn strategy(&self, ty: &Type, direction: Direction) -> CallResult<Strategy> {
        strategy_for(ty, direction, self.table).map_err(|_| CallError::Unsupported(ty.to_string()))
    }

    fn expect(&self, ty: &Type, x: Sexp, storage: Storage) -> CallResult<()> {
        let found = self.heap.type_of(x)?;
        let expected = storage.sexp_type();
        if found != expected {
            return Err(CallError::Kind { ty: ty.to_string(), expected, found });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Decode
    // -----------------------------------------------------------------------

    /// Decode `x` as a value of `ty`.
    pub fn decode(&mut self, ty: &Type, x: Sexp) -> CallResult<Value> {
        let strategy = self.strategy(ty, Direction::Decode)?;
        self.decode_with(ty, &strategy, x)
    }

    /// Decode `x` with an explicit strategy.
    pub fn decode_with(&mut self, ty: &Type, strategy: &Strategy, x: Sexp) -> CallResult<Value> {
        match strategy {
            Strategy::Scalar { kind, storage } => {
                self.expect(ty, x, *storage)?;
                if self.heap.length(x)? == 0 {
                    return Err(CallError::EmptyScalar(ty.to_string()));
                }
                self.read(*kind, *storage, x, 0)
            }

            Strategy::Narrow { via, .. } => match self.decode(via, x)? {
                Value::Complex(r, i) => Ok(Value::Complex(r as f32 as f64, i as f32 as f64)),
                _ => Err(CallError::Shape(ty.to_string())),
            },

            Strategy::SliceAlias { kind, storage } => {
                if x.is_nil() {
                    return Ok(Value::Nil);
                }
                self.expect(ty, x, *storage)?;
                let view = match kind {
                    BasicKind::Uint8 => View::Uint8(self.heap.raw(x)?),
                    BasicKind::Int32 => View::Int32(self.heap.integer(x)?),
                    BasicKind::Uint32 => View::Uint32(self.heap.integer(x)?),
                    BasicKind::Float64 => View::Float64(self.heap.real(x)?),
                    BasicKind::Complex128 => View::Complex128(self.heap.complex(x)?),
                    _ => return Err(CallError::Unsupported(ty.to_string())),
                };
                Ok(Value::Slice(Slice::View(view)))
            }

            Strategy::SliceConvert { kind, storage, .. } => {
                self.decode_slice(ty, Elem::Basic(*kind, *storage), x)
            }
            Strategy::SliceString { .. } => {
                self.decode_slice(ty, Elem::Basic(BasicKind::String, Storage::Character), x)
            }
            Strategy::SliceDelegate { elem } => self.decode_slice(ty, Elem::Delegate(elem), x),

            Strategy::Array { len, slice } => {
                let Type::Slice(elem) = slice else {
                    return Err(CallError::Unsupported(ty.to_string()));
                };
                let mut elems = match self.decode(slice, x)? {
                    Value::Slice(s) => s.to_values(),
                    _ => Vec::new(),
                };
                let len = *len as usize;
                elems.truncate(len);
                while elems.len() < len {
                    elems.push(Value::zero(elem, self.table));
                }
                Ok(Value::Array(elems))
            }

            Strategy::MapFast { kind, storage, .. } => {
                self.decode_map(ty, Elem::Basic(*kind, *storage), x)
            }
            Strategy::MapString { .. } => {
                self.decode_map(ty, Elem::Basic(BasicKind::String, Storage::Character), x)
            }
            Strategy::MapDelegate { elem } => self.decode_map(ty, Elem::Delegate(elem), x),

            Strategy::Struct { fields, .. } => self.decode_struct(ty, fields, x),

            Strategy::Pointer { elem } => {
                if x.is_nil() {
                    return Ok(Value::Nil);
                }
                Ok(Value::pointer(self.decode(elem, x)?))
            }

            Strategy::Named { underlying, .. } => self.decode(underlying, x),

            Strategy::Error => Err(CallError::Unsupported(ty.to_string())),
        }
    }

    fn decode_slice(&mut self, ty: &Type, elem: Elem<'_>, x: Sexp) -> CallResult<Value> {
        if x.is_nil() {
            return Ok(Value::Nil);
        }
        self.expect(ty, x, elem.storage())?;
        let n = self.heap.length(x)?;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            out.push(self.read_elem(&elem, x, i)?);
        }
        Ok(Value::slice(out))
    }

    fn decode_map(&mut self, ty: &Type, elem: Elem<'_>, x: Sexp) -> CallResult<Value> {
        if x.is_nil() {
            return Ok(Value::Nil);
        }
        self.expect(ty, x, elem.storage())?;
        let n = self.heap.length(x)?;
        let names = self.heap.names(x)?;
        let mut out = BTreeMap::new();
        if names.is_nil() {
            if n == 0 {
                return Ok(Value::Map(out));
            }
            return Err(CallError::MissingNames);
        }
        for i in 0..n {
            let key = self.heap.string_elt(names, i)?.unwrap_or("NA").to_string();
            let value = self.read_elem(&elem, x, i)?;
            out.insert(key, value);
        }
        Ok(Value::Map(out))
    }

    fn decode_struct(&mut self, ty: &Type, fields: &[FieldPlan], x: Sexp) -> CallResult<Value> {
        if !x.is_nil() {
            self.expect(ty, x, Storage::List)?;
        }
        let n = self.heap.length(x)?;
        if n < fields.len() {
            let mut missing = &fields[n];
            for f in fields {
                if self.heap.list_element_index(x, &f.external)?.is_none() {
                    missing = f;
                    break;
                }
            }
            return Err(CallError::MissingField { ty: ty.to_string(), field: missing.name.clone() });
        }
        if n > fields.len() {
            let msg = format!("extra list element ignored for {ty}");
            warn!("{msg}");
            self.advisories.push(msg);
        }

        let mut out = Vec::with_capacity(fields.len());
        for f in fields {
            let i = self.heap.list_element_index(x, &f.external)?.ok_or_else(|| {
                CallError::MissingField { ty: ty.to_string(), field: f.name.clone() }
            })?;
            let elem = self.heap.get_element(x, i)?;
            out.push((f.name.clone(), self.decode(&f.ty, elem)?));
        }
        Ok(Value::Struct(out))
    }

    fn read_elem(&mut self, elem: &Elem<'_>, x: Sexp, i: usize) -> CallResult<Value> {
        match elem {
            Elem::Basic(kind, storage) => self.read(*kind, *storage, x, i),
            Elem::Delegate(ty) => {
                let e = self.heap.get_element(x, i)?;
                self.decode(ty, e)
            }
        }
    }

    /// Read element `i` of atomic storage as a value of `kind`, applying the
    /// Go conversion from the storage element type.
    fn read(&self, kind: BasicKind, storage: Storage, x: Sexp, i: usize) -> CallResult<Value> {
        let kind = kind.normalize();
        let v = match storage {
            Storage::Logical => Value::Bool(self.heap.logical(x)?.get(i)? == 1),
            Storage::Integer => {
                let v = self.heap.integer(x)?.get(i)?;
                match kind {
                    BasicKind::Int8 => Value::Int(v as i8 as i64),
                    BasicKind::Int16 => Value::Int(v as i16 as i64),
                    BasicKind::Uint => Value::Uint(v as i64 as u64),
                    BasicKind::Uint16 => Value::Uint(v as u16 as u64),
                    BasicKind::Uint32 => Value::Uint(v as u32 as u64),
                    _ => Value::Int(v as i64),
                }
            }
            Storage::Raw => Value::Uint(self.heap.raw(x)?.get(i)? as u64),
            Storage::Real => {
                let v = self.heap.real(x)?.get(i)?;
                if kind == BasicKind::Float32 {
                    Value::Float(v as f32 as f64)
                } else {
                    Value::Float(v)
                }
            }
            Storage::Complex => {
                let c = self.heap.complex(x)?.get(i)?;
                if kind == BasicKind::Complex64 {
                    Value::Complex(c.r as f32 as f64, c.i as f32 as f64)
                } else {
                    Value::Complex(c.r, c.i)
                }
            }
            // NA_character_ reads as the string "NA".
            Storage::Character => {
                Value::String(self.heap.string_elt(x, i)?.unwrap_or("NA").to_string())
            }
            Storage::List => return Err(CallError::Unsupported(kind.name().to_string())),
        };
        Ok(v)
    }

    // -----------------------------------------------------------------------
    // Encode
    // -----------------------------------------------------------------------

    /// Encode `v` as a boxed value of `ty`.
    ///
    /// The protect stack is left at the depth it had on entry, on success
    /// and on error.
    pub fn encode(&mut self, ty: &Type, v: &Value) -> CallResult<Sexp> {
        let depth = self.heap.protected();
        let res = self.encode_value(ty, v);
        let extra = self.heap.protected().saturating_sub(depth);
        if extra > 0 {
            self.heap.unprotect(extra)?;
        }
        res
    }

    fn encode_value(&mut self, ty: &Type, v: &Value) -> CallResult<Sexp> {
        let strategy = self.strategy(ty, Direction::Encode)?;
        let shape = || CallError::Shape(ty.to_string());
        match &strategy {
            Strategy::Scalar { kind, storage } => {
                let x = self.heap.allocate_scalar(storage.sexp_type())?;
                self.write(*kind, *storage, x, 0, v)?;
                Ok(x)
            }

            Strategy::Narrow { via, .. } => self.encode_value(via, v),

            Strategy::SliceAlias { kind, storage } => match v {
                Value::Nil => Ok(Sexp::NIL),
                Value::Slice(Slice::View(view)) if view.kind() == *kind => {
                    let x = self.heap.allocate_vector(storage.sexp_type(), view.len())?;
                    self.copy_view(view, x)?;
                    Ok(x)
                }
                Value::Slice(s) => self.encode_elems(Elem::Basic(*kind, *storage), &s.to_values()),
                _ => Err(shape()),
            },

            Strategy::SliceConvert { kind, storage, .. } => {
                self.encode_slice(ty, Elem::Basic(*kind, *storage), v)
            }
            Strategy::SliceString { .. } => {
                self.encode_slice(ty, Elem::Basic(BasicKind::String, Storage::Character), v)
            }
            Strategy::SliceDelegate { elem } => self.encode_slice(ty, Elem::Delegate(elem), v),

            Strategy::Array { len, slice } => match v {
                Value::Array(elems) if elems.len() as u64 == *len => {
                    self.encode_value(slice, &Value::slice(elems.clone()))
                }
                _ => Err(shape()),
            },

            Strategy::MapFast { kind, storage, .. } => {
                self.encode_map(ty, Elem::Basic(*kind, *storage), v)
            }
            Strategy::MapString { .. } => {
                self.encode_map(ty, Elem::Basic(BasicKind::String, Storage::Character), v)
            }
            Strategy::MapDelegate { elem } => self.encode_map(ty, Elem::Delegate(elem), v),

            Strategy::Struct { fields, .. } => {
                let Value::Struct(values) = v else {
                    return Err(shape());
                };
                let x = self.heap.allocate_vector(Storage::List.sexp_type(), fields.len())?;
                self.heap.protect(x);
                let names = self.heap.allocate_vector(Storage::Character.sexp_type(), fields.len())?;
                self.heap.protect(names);
                for (i, f) in fields.iter().enumerate() {
                    let fv = values
                        .iter()
                        .find(|(name, _)| *name == f.name)
                        .map(|(_, fv)| fv)
                        .ok_or_else(shape)?;
                    self.heap.set_string_elt(names, i, Some(f.external.as_str()))?;
                    let e = self.encode_value(&f.ty, fv)?;
                    self.heap.set_element(x, i, e)?;
                }
                self.heap.set_names(x, names)?;
                self.heap.unprotect(2)?;
                Ok(x)
            }

            Strategy::Pointer { elem } => match v {
                Value::Nil => Ok(Sexp::NIL),
                Value::Pointer(inner) => self.encode_value(elem, inner),
                _ => Err(shape()),
            },

            Strategy::Named { underlying, .. } => self.encode_value(underlying, v),

            Strategy::Error => match v {
                Value::Nil => Ok(Sexp::NIL),
                Value::Error(msg) => self.encode_value(&Type::string(), &Value::string(msg.as_str())),
                _ => Err(shape()),
            },
        }
    }

    fn encode_slice(&mut self, ty: &Type, elem: Elem<'_>, v: &Value) -> CallResult<Sexp> {
        match v {
            Value::Nil => Ok(Sexp::NIL),
            Value::Slice(s) => self.encode_elems(elem, &s.to_values()),
            _ => Err(CallError::Shape(ty.to_string())),
        }
    }

    fn encode_elems(&mut self, elem: Elem<'_>, values: &[Value]) -> CallResult<Sexp> {
        let x = self.heap.allocate_vector(elem.storage().sexp_type(), values.len())?;
        self.heap.protect(x);
        for (i, v) in values.iter().enumerate() {
            self.write_elem(&elem, x, i, v)?;
        }
        self.heap.unprotect(1)?;
        Ok(x)
    }

    fn encode_map(&mut self, ty: &Type, elem: Elem<'_>, v: &Value) -> CallResult<Sexp> {
        let entries = match v {
            Value::Nil => return Ok(Sexp::NIL),
            Value::Map(m) => m,
            _ => return Err(CallError::Shape(ty.to_string())),
        };
        let n = entries.len();
        let x = self.heap.allocate_vector(elem.storage().sexp_type(), n)?;
        self.heap.protect(x);
        let names = self.heap.allocate_vector(Storage::Character.sexp_type(), n)?;
        self.heap.protect(names);
        for (i, (key, value)) in entries.iter().enumerate() {
            self.heap.set_string_elt(names, i, Some(key.as_str()))?;
            self.write_elem(&elem, x, i, value)?;
        }
        if n > 0 {
            self.heap.set_names(x, names)?;
        }
        self.heap.unprotect(2)?;
        Ok(x)
    }

    fn write_elem(&mut self, elem: &Elem<'_>, x: Sexp, i: usize, v: &Value) -> CallResult<()> {
        match elem {
            Elem::Basic(kind, storage) => self.write(*kind, *storage, x, i, v),
            Elem::Delegate(ty) => {
                let e = self.encode_value(ty, v)?;
                self.heap.set_element(x, i, e)?;
                Ok(())
            }
        }
    }

    /// Block copy of a view into freshly allocated storage of the same kind.
    fn copy_view(&mut self, view: &View, x: Sexp) -> CallResult<()> {
        match view {
            View::Uint8(b) => self.heap.raw(x)?.copy_from_slice(&b.as_slice())?,
            View::Int32(b) | View::Uint32(b) => self.heap.integer(x)?.copy_from_slice(&b.as_slice())?,
            View::Float64(b) => self.heap.real(x)?.copy_from_slice(&b.as_slice())?,
            View::Complex128(b) => self.heap.complex(x)?.copy_from_slice(&b.as_slice())?,
        }
        Ok(())
    }

    /// Write `v` into element `i` of atomic storage, applying the Go
    /// conversion to the storage element type.
    fn write(&mut self, kind: BasicKind, storage: Storage, x: Sexp, i: usize, v: &Value) -> CallResult<()> {
        let shape = || CallError::Shape(kind.name().to_string());
        match (storage, v) {
            (Storage::Logical, Value::Bool(b)) => self.heap.logical(x)?.set(i, *b as i32)?,
            (Storage::Integer, Value::Int(n)) => self.heap.integer(x)?.set(i, *n as i32)?,
            (Storage::Integer, Value::Uint(n)) => self.heap.integer(x)?.set(i, *n as i32)?,
            (Storage::Raw, Value::Uint(n)) => self.heap.raw(x)?.set(i, *n as u8)?,
            (Storage::Raw, Value::Int(n)) => self.heap.raw(x)?.set(i, *n as u8)?,
            (Storage::Real, Value::Float(f)) => self.heap.real(x)?.set(i, *f)?,
            (Storage::Complex, Value::Complex(r, im)) => {
                self.heap.complex(x)?.set(i, Rcomplex { r: *r, i: *im })?
            }
            (Storage::Character, Value::String(s)) => {
                self.heap.set_string_elt(x, i, Some(s.as_str()))?
            }
            _ => return Err(shape()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Named};
    use crate::strategy::{Strategy, strategy_for};
    use crate::walk::Direction;
    use proptest::prelude::*;
    use rgo_sexp::{NA_LOGICAL, SexpType};

    fn basic(k: BasicKind) -> Type {
        Type::Basic(k)
    }

    /// decode then encode, checking the result is identical to the input
    /// and the protect stack is balanced.
    fn assert_round_trip(heap: &mut Heap, table: &TypeTable, ty: &Type, x: Sexp) {
        let mut m = Marshaller::new(heap, table);
        let v = m.decode(ty, x).unwrap();
        let y = m.encode(ty, &v).unwrap();
        assert_eq!(m.heap().protected(), 0, "unbalanced protect for {ty}");
        assert!(m.heap().identical(x, y), "round trip changed value of {ty}");
    }

    #[test]
    fn test_round_trip_scalars() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let cases = [
            (basic(BasicKind::Int32), heap.scalar_integer(-7)),
            (basic(BasicKind::Uint), heap.scalar_integer(-1)),
            (basic(BasicKind::Bool), heap.scalar_logical(true)),
            (basic(BasicKind::Byte), heap.scalar_raw(200)),
            (basic(BasicKind::Float64), heap.scalar_real(2.5)),
            (basic(BasicKind::Complex128), heap.scalar_complex(Rcomplex { r: 1.0, i: -2.0 })),
            (basic(BasicKind::Complex64), heap.scalar_complex(Rcomplex { r: 0.5, i: 4.0 })),
            (Type::string(), heap.scalar_string("héllo")),
        ];
        for (ty, x) in cases {
            assert_round_trip(&mut heap, &table, &ty, x);
        }
    }

    #[test]
    fn test_round_trip_slices() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let strs = heap.string_vector(&["a", "", "c"]);
        let cases = [
            (Type::slice(basic(BasicKind::Float64)), heap.real_vector(&[1.0, -0.0, f64::NAN])),
            (Type::slice(basic(BasicKind::Uint32)), heap.integer_vector(&[-1, 0, 7])),
            (Type::slice(basic(BasicKind::Byte)), heap.raw_vector(&[0, 255])),
            (Type::slice(basic(BasicKind::Int16)), heap.integer_vector(&[-3, 3])),
            (Type::slice(basic(BasicKind::Bool)), heap.logical_vector(&[true, false])),
            (Type::slice(basic(BasicKind::Float32)), heap.real_vector(&[0.5, 8.0])),
            (Type::slice(Type::string()), strs),
            (Type::slice(basic(BasicKind::Int32)), Sexp::NIL),
            (Type::slice(basic(BasicKind::Int)), heap.integer_vector(&[])),
            (
                Type::slice(basic(BasicKind::Complex128)),
                heap.complex_vector(&[Rcomplex { r: 1.0, i: 2.0 }, Rcomplex { r: -0.5, i: 0.0 }]),
            ),
        ];
        for (ty, x) in cases {
            assert_round_trip(&mut heap, &table, &ty, x);
        }
    }

    #[test]
    fn test_round_trip_composites() {
        let mut heap = Heap::new();
        let mut table = TypeTable::new();
        let meters = Named::new("example.com/units", "Meters");
        table.insert(&meters, basic(BasicKind::Float64));

        let point = Type::Struct(vec![
            Field::tagged("X", basic(BasicKind::Int32), r#"rgo:"x""#),
            Field::new("Label", Type::string()),
        ]);
        let make_point = |heap: &mut Heap, x: i32, label: &str| {
            let xv = heap.scalar_integer(x);
            let lv = heap.scalar_string(label);
            heap.named_list(&[("x", xv), ("Label", lv)]).unwrap()
        };
        let p1 = make_point(&mut heap, 1, "one");
        let p2 = make_point(&mut heap, 2, "two");
        let points = heap.list(&[p1, p2]);

        let arr = heap.real_vector(&[1.0, 2.0, 3.0]);

        let fast = heap.real_vector(&[1.5, 2.5]);
        let keys = heap.string_vector(&["a", "b"]);
        heap.set_names(fast, keys).unwrap();

        let v1 = heap.string_vector(&["x"]);
        let v2 = heap.string_vector(&["y", "z"]);
        let delegated = heap.named_list(&[("k1", v1), ("k2", v2)]).unwrap();

        let ptr = heap.scalar_integer(9);
        let meters_val = heap.scalar_real(3.25);

        let strings = heap.string_vector(&["1", "two"]);
        let string_keys = heap.string_vector(&["a", "b"]);
        heap.set_names(strings, string_keys).unwrap();

        let span = Type::Struct(vec![
            Field::tagged("Len", Type::Named(meters.clone()), r#"rgo:"len""#),
            Field::new("Tags", Type::slice(Type::string())),
        ]);
        let len_val = heap.scalar_real(12.5);
        let tags = heap.string_vector(&["a", "b"]);
        let span_val = heap.named_list(&[("len", len_val), ("Tags", tags)]).unwrap();

        let cases = [
            (point.clone(), p1),
            (Type::slice(point), points),
            (Type::array(basic(BasicKind::Float64), 3), arr),
            (Type::map(Type::string(), basic(BasicKind::Float64)), fast),
            (Type::map(Type::string(), Type::slice(Type::string())), delegated),
            (Type::pointer(basic(BasicKind::Int32)), ptr),
            (Type::pointer(basic(BasicKind::Int32)), Sexp::NIL),
            (Type::Named(meters), meters_val),
            (Type::map(Type::string(), Type::string()), strings),
            (span, span_val),
        ];
        for (ty, x) in cases {
            assert_round_trip(&mut heap, &table, &ty, x);
        }
    }

    #[test]
    fn test_round_trip_rows_use_expected_strategies() {
        let table = TypeTable::new();
        assert_eq!(
            strategy_for(&Type::slice(basic(BasicKind::Complex128)), Direction::Decode, &table),
            Ok(Strategy::SliceAlias { kind: BasicKind::Complex128, storage: Storage::Complex })
        );
        assert_eq!(
            strategy_for(&Type::map(Type::string(), Type::string()), Direction::Encode, &table),
            Ok(Strategy::MapString { elem: Type::string() })
        );
    }

    #[test]
    fn test_complex_slice_decode_aliases_vector() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let x = heap.complex_vector(&[Rcomplex { r: 1.0, i: 1.0 }]);
        let mut m = Marshaller::new(&mut heap, &table);
        let v = m.decode(&Type::slice(basic(BasicKind::Complex128)), x).unwrap();
        let Value::Slice(Slice::View(View::Complex128(buf))) = &v else {
            panic!("expected a complex128 view, got {v:?}");
        };
        buf.set(0, Rcomplex { r: 5.0, i: -5.0 }).unwrap();
        assert_eq!(m.heap().complex(x).unwrap().get(0).unwrap(), Rcomplex { r: 5.0, i: -5.0 });
    }

    #[test]
    fn test_error_encode() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let mut m = Marshaller::new(&mut heap, &table);
        assert_eq!(m.encode(&Type::Error, &Value::Nil).unwrap(), Sexp::NIL);
        let x = m.encode(&Type::Error, &Value::Error("boom".into())).unwrap();
        assert_eq!(m.heap().string_elt(x, 0).unwrap(), Some("boom"));
        assert_eq!(m.decode(&Type::Error, x), Err(CallError::Unsupported("error".into())));
    }

    #[test]
    fn test_scalar_conversions() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let big = heap.scalar_integer(300);
        let na = heap.allocate_vector(SexpType::Character, 1).unwrap();
        heap.set_string_elt(na, 0, None).unwrap();
        let na_lgl = heap.logical_vector(&[true]);
        heap.logical(na_lgl).unwrap().set(0, NA_LOGICAL).unwrap();
        let empty = heap.integer_vector(&[]);
        let mut m = Marshaller::new(&mut heap, &table);

        assert_eq!(m.decode(&basic(BasicKind::Int8), big).unwrap(), Value::Int(44));
        assert_eq!(m.decode(&Type::string(), na).unwrap(), Value::string("NA"));
        assert_eq!(
            m.decode(&basic(BasicKind::Float64), big),
            Err(CallError::Kind {
                ty: "float64".into(),
                expected: SexpType::Real,
                found: SexpType::Integer,
            })
        );
        assert_eq!(
            m.decode(&basic(BasicKind::Int), empty),
            Err(CallError::EmptyScalar("int".into()))
        );
        assert_eq!(m.decode(&basic(BasicKind::Bool), na_lgl).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_array_pads_and_truncates() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let short = heap.integer_vector(&[1]);
        let long = heap.integer_vector(&[1, 2, 3, 4]);
        let mut m = Marshaller::new(&mut heap, &table);
        let ty = Type::array(basic(BasicKind::Int16), 3);
        assert_eq!(
            m.decode(&ty, short).unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(0), Value::Int(0)])
        );
        assert_eq!(
            m.decode(&ty, long).unwrap(),
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_map_requires_names() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let unnamed = heap.integer_vector(&[1, 2]);
        let empty = heap.integer_vector(&[]);
        let mut m = Marshaller::new(&mut heap, &table);
        let ty = Type::map(Type::string(), basic(BasicKind::Int));
        assert_eq!(m.decode(&ty, unnamed), Err(CallError::MissingNames));
        assert_eq!(m.decode(&ty, empty).unwrap(), Value::Map(BTreeMap::new()));
    }

    fn stats() -> Type {
        Type::Struct(vec![
            Field::tagged("Count", basic(BasicKind::Int), r#"rgo:"count""#),
            Field::tagged("Length", basic(BasicKind::Int), r#"rgo:"length""#),
        ])
    }

    #[test]
    fn test_struct_missing_field_names_first_absent() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let len = heap.scalar_integer(4);
        let only_length = heap.named_list(&[("length", len)]).unwrap();
        let mut m = Marshaller::new(&mut heap, &table);
        let ty = stats();
        assert_eq!(
            m.decode(&ty, only_length),
            Err(CallError::MissingField { ty: ty.to_string(), field: "Count".into() })
        );
        assert_eq!(
            m.decode(&ty, Sexp::NIL),
            Err(CallError::MissingField { ty: ty.to_string(), field: "Count".into() })
        );
    }

    #[test]
    fn test_struct_extra_element_is_advisory() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let c = heap.scalar_integer(2);
        let l = heap.scalar_integer(5);
        let junk = heap.scalar_string("?");
        let list = heap.named_list(&[("junk", junk), ("length", l), ("count", c)]).unwrap();
        let mut m = Marshaller::new(&mut heap, &table);
        let ty = stats();
        let v = m.decode(&ty, list).unwrap();
        assert_eq!(
            v,
            Value::Struct(vec![("Count".into(), Value::Int(2)), ("Length".into(), Value::Int(5))])
        );
        assert_eq!(m.advisories(), [format!("extra list element ignored for {ty}")]);
    }

    #[test]
    fn test_struct_lookup_is_by_name() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let c = heap.scalar_integer(2);
        let l = heap.scalar_integer(5);
        let wrong = heap.named_list(&[("count", c), ("width", l)]).unwrap();
        let mut m = Marshaller::new(&mut heap, &table);
        let ty = stats();
        assert_eq!(
            m.decode(&ty, wrong),
            Err(CallError::MissingField { ty: ty.to_string(), field: "Length".into() })
        );
    }

    #[test]
    fn test_zero_copy_view_aliases_boxed_storage() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let x = heap.real_vector(&[1.0, 2.0, 3.0]);
        let mut m = Marshaller::new(&mut heap, &table);
        let v = m.decode(&Type::slice(basic(BasicKind::Float64)), x).unwrap();
        let Value::Slice(Slice::View(View::Float64(buf))) = v else {
            panic!("expected a float64 view");
        };
        buf.set(1, 42.0).unwrap();
        assert_eq!(m.heap().real(x).unwrap().to_vec(), vec![1.0, 42.0, 3.0]);
    }

    #[test]
    fn test_encode_error_restores_protect_depth() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let mut m = Marshaller::new(&mut heap, &table);
        let ty = Type::map(Type::string(), Type::slice(basic(BasicKind::Int32)));
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), Value::slice(vec![Value::Int(1)]));
        entries.insert("b".to_string(), Value::string("not a slice"));
        assert!(m.encode(&ty, &Value::Map(entries)).is_err());
        assert_eq!(m.heap().protected(), 0);
    }

    #[test]
    fn test_unsupported_types() {
        let mut heap = Heap::new();
        let table = TypeTable::new();
        let x = heap.scalar_integer(1);
        let mut m = Marshaller::new(&mut heap, &table);
        assert_eq!(
            m.decode(&basic(BasicKind::Int64), x),
            Err(CallError::Unsupported("int64".into()))
        );
    }

    proptest! {
        #[test]
        fn prop_float64_fast_path_matches_element_loop(data in prop::collection::vec(any::<f64>(), 0..64)) {
            let mut heap = Heap::new();
            let table = TypeTable::new();
            let x = heap.real_vector(&data);
            let mut m = Marshaller::new(&mut heap, &table);
            let ty = Type::slice(basic(BasicKind::Float64));
            let alias = Strategy::SliceAlias { kind: BasicKind::Float64, storage: Storage::Real };
            let naive = Strategy::SliceConvert {
                elem: basic(BasicKind::Float64),
                kind: BasicKind::Float64,
                storage: Storage::Real,
            };
            let fast = m.decode_with(&ty, &alias, x).unwrap();
            let slow = m.decode_with(&ty, &naive, x).unwrap();
            let (Value::Slice(fast), Value::Slice(slow)) = (fast, slow) else {
                panic!("expected slices");
            };
            let bits = |s: &Slice| -> Vec<u64> {
                s.to_values()
                    .into_iter()
                    .map(|v| match v {
                        Value::Float(f) => f.to_bits(),
                        other => panic!("unexpected element {other:?}"),
                    })
                    .collect()
            };
            prop_assert_eq!(bits(&fast), bits(&slow));
            prop_assert_eq!(fast.len(), data.len());
        }
    }
}
