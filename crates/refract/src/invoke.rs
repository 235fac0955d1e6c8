//! Dynamic function calls, native function values and bound methods

use std::sync::Arc;

use crate::container::new_slice_data;
use crate::error::{invalid, raise, ReflectError};
use crate::types::{Kind, MethodEntry, MethodSource, Receiver, Type};
use crate::value::{corrupt, Data, Flags, FuncRef, Value};

impl Value {
    /// Function value of type `ty` whose calls run `f`.
    ///
    /// `f` receives one value per parameter, a variadic tail already packed
    /// into a slice, and must return one value per result. Violations are
    /// detected when the function is called.
    pub fn make_func<F>(ty: Type, f: F) -> Value
    where
        F: Fn(&[Value]) -> Vec<Value> + Send + Sync + 'static,
    {
        if ty.kind() != Kind::Func {
            raise(ReflectError::KindMismatch {
                method: "Value::make_func",
                kind: ty.kind(),
            });
        }
        Value::direct(ty, Data::Func(Some(FuncRef(Arc::new(f)))))
    }

    /// Call a Func with `args`; trailing arguments of a variadic function
    /// are packed into a fresh slice
    pub fn call(&self, args: &[Value]) -> Vec<Value> {
        self.call_impl("Value::call", args, false)
    }

    /// Call a variadic Func whose last argument is the complete variadic
    /// slice
    pub fn call_with_expanded_slice(&self, args: &[Value]) -> Vec<Value> {
        self.call_impl("Value::call_with_expanded_slice", args, true)
    }

    fn call_impl(&self, method: &'static str, args: &[Value], expanded: bool) -> Vec<Value> {
        let h = self.expect_kind(method, Kind::Func);
        self.must_be_exported(method);
        let ty = h.ty;
        let func = match self.load() {
            Data::Func(Some(f)) => f,
            Data::Func(None) => raise(ReflectError::NilFunction),
            _ => corrupt(),
        };

        let n = ty.num_params();
        let variadic = ty.is_variadic();
        if expanded && !variadic {
            invalid(format!("{} of non-variadic function {}", method, ty));
        }
        let arity_ok = if variadic && !expanded {
            args.len() + 1 >= n
        } else {
            args.len() == n
        };
        if !arity_ok {
            raise(ReflectError::ArgumentCount {
                method,
                got: args.len(),
                want: if variadic && !expanded { n - 1 } else { n },
            });
        }
        for (i, arg) in args.iter().enumerate() {
            if !arg.is_valid() {
                invalid(format!("{} using zero Value argument {}", method, i));
            }
            arg.must_be_exported(method);
        }

        let fixed = if variadic && !expanded { n - 1 } else { n };
        let mut inputs: Vec<Value> = args[..fixed]
            .iter()
            .enumerate()
            .map(|(i, arg)| {
                let param = ty.param(i);
                Value::direct(param, arg.assign_to(method, param))
            })
            .collect();
        if variadic && !expanded {
            let slice_ty = ty.param(n - 1);
            let elem = slice_ty.elem();
            let items = args[fixed..].iter().map(|arg| arg.assign_to(method, elem)).collect();
            inputs.push(Value::direct(slice_ty, new_slice_data(elem, items)));
        }

        tracing::trace!(func = %ty, args = inputs.len(), "dynamic call");
        let results = (func.0)(&inputs);

        if results.len() != ty.num_results() {
            raise(ReflectError::ResultCount {
                ty: ty.to_string(),
                got: results.len(),
                want: ty.num_results(),
            });
        }
        results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                if !result.is_valid() {
                    invalid(format!("function of type {} returned zero Value as result {}", ty, i));
                }
                if result.flags().intersects(Flags::RO) {
                    raise(ReflectError::Unexported {
                        method: "Value::make_func",
                    });
                }
                let want = ty.result(i);
                Value::direct(want, result.assign_to(method, want))
            })
            .collect()
    }

    /// Number of methods in the value's enumerable method set
    pub fn num_methods(&self) -> usize {
        self.ty().num_methods()
    }

    /// The i'th method bound to this value as receiver
    pub fn method(&self, i: usize) -> Value {
        const METHOD: &str = "Value::method";
        let ty = self.handle(METHOD).ty;
        let table = ty.method_table();
        let entry = match table.visible_entry(i) {
            Some(entry) => entry.clone(),
            None => raise(ReflectError::IndexOutOfRange {
                method: METHOD,
                index: i,
                len: table.visible.len(),
            }),
        };
        self.bind(METHOD, entry)
    }

    /// Method by name bound to this value; the zero handle if absent
    pub fn method_by_name(&self, name: &str) -> Value {
        const METHOD: &str = "Value::method_by_name";
        let ty = self.handle(METHOD).ty;
        let table = ty.method_table();
        match table.visible_position(name).and_then(|i| table.visible_entry(i)) {
            Some(entry) => self.bind(METHOD, entry.clone()),
            None => Value::default(),
        }
    }

    fn bind(&self, method: &'static str, entry: MethodEntry) -> Value {
        if self.kind() == Kind::Interface && self.is_nil() {
            invalid(format!("{} on nil interface value", method));
        }
        let ty = entry.ty;
        let receiver = self.clone();
        let body = move |args: &[Value]| call_entry(&receiver, &entry, args);
        Value::direct_flagged(ty, Data::Func(Some(FuncRef(Arc::new(body)))), self.flags().ro())
    }
}

/// Run the method `entry` of `recv`'s method set with already-assigned
/// arguments
pub(crate) fn call_entry(recv: &Value, entry: &MethodEntry, args: &[Value]) -> Vec<Value> {
    let mut v = recv.clone();
    for &i in &entry.path {
        v = deref(v, &entry.name);
        v = v.field_raw(i);
    }
    match &entry.source {
        MethodSource::Interface { .. } => {
            let dynamic = v.elem();
            if !dynamic.is_valid() {
                invalid(format!("call of method {} on nil interface value", entry.name));
            }
            match dynamic.ty().method_table().find(&entry.name) {
                Some(target) => call_entry(&dynamic, target, args),
                None => invalid(format!("{} has no method {}", dynamic.ty(), entry.name)),
            }
        }
        MethodSource::Declared { owner, def } => {
            let receiver = match def.receiver {
                Receiver::Pointer if v.kind() == Kind::Pointer => v,
                Receiver::Pointer => match v.place() {
                    Some(place) if v.can_address() => {
                        Value::direct(Type::pointer_to(*owner), Data::Pointer(Some(place.clone())))
                    }
                    _ => invalid(format!("method {} requires an addressable receiver", entry.name)),
                },
                Receiver::Value => {
                    let v = if v.ty() == *owner { v } else { deref(v, &entry.name) };
                    Value::direct(v.ty(), v.load())
                }
            };
            (def.body)(&receiver, args)
        }
    }
}

/// The pointee of a pointer on the way to a promoted method
fn deref(v: Value, name: &str) -> Value {
    if v.kind() != Kind::Pointer {
        return v;
    }
    let target = v.elem();
    if !target.is_valid() {
        invalid(format!("call of method {} through nil embedded pointer", name));
    }
    target
}
