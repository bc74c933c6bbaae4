//! Mutation primitives applied to a single attribute of a stored value
//! (§3 Funcall).

use serde::{Deserialize, Serialize};

use crate::datatype::{DataType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuncallName {
    Set,
    NumAdd,
    NumSub,
    NumMul,
    NumDiv,
    NumMod,
    NumAnd,
    NumOr,
    NumXor,
    StringPrepend,
    StringAppend,
    ListLpush,
    ListRpush,
    SetAdd,
    SetRemove,
    SetIntersect,
    SetUnion,
    MapAdd,
    MapRemove,
}

/// `{attr, name, arg1, arg1_type, arg2, arg2_type}`. For most funcalls only
/// `arg1` is used; map mutations additionally carry a key in `arg2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funcall {
    pub attr: usize,
    pub name: FuncallName,
    pub arg1: Option<Value>,
    pub arg1_type: Option<DataType>,
    pub arg2: Option<Value>,
    pub arg2_type: Option<DataType>,
}

impl Funcall {
    #[must_use]
    pub fn set(attr: usize, value: Value) -> Self {
        let dt = value.datatype();
        Self { attr, name: FuncallName::Set, arg1: Some(value), arg1_type: Some(dt), arg2: None, arg2_type: None }
    }

    #[must_use]
    pub fn map_entry(attr: usize, name: FuncallName, key: Value, value: Value) -> Self {
        let kt = key.datatype();
        let vt = value.datatype();
        Self {
            attr,
            name,
            arg1: Some(value),
            arg1_type: Some(vt),
            arg2: Some(key),
            arg2_type: Some(kt),
        }
    }

    /// Applies the funcall to `current` (`None` if the attribute has no
    /// stored value yet), producing the new value or `None` if the
    /// primitive is incompatible with the stored type.
    #[must_use]
    pub fn apply(&self, current: Option<&Value>) -> Option<Value> {
        match self.name {
            FuncallName::Set => self.arg1.clone(),
            FuncallName::NumAdd | FuncallName::NumSub | FuncallName::NumMul | FuncallName::NumDiv
            | FuncallName::NumMod | FuncallName::NumAnd | FuncallName::NumOr | FuncallName::NumXor => {
                apply_numeric(self.name, current, self.arg1.as_ref())
            }
            FuncallName::StringPrepend => match (current, &self.arg1) {
                (Some(Value::String(s)), Some(Value::String(prefix))) => {
                    let mut out = prefix.clone();
                    out.extend_from_slice(s);
                    Some(Value::String(out))
                }
                (None, Some(Value::String(prefix))) => Some(Value::String(prefix.clone())),
                _ => None,
            },
            FuncallName::StringAppend => match (current, &self.arg1) {
                (Some(Value::String(s)), Some(Value::String(suffix))) => {
                    let mut out = s.clone();
                    out.extend_from_slice(suffix);
                    Some(Value::String(out))
                }
                (None, Some(Value::String(suffix))) => Some(Value::String(suffix.clone())),
                _ => None,
            },
            FuncallName::ListLpush => self.list_push(current, true),
            FuncallName::ListRpush => self.list_push(current, false),
            FuncallName::SetAdd => self.set_op(current, SetOp::Add),
            FuncallName::SetRemove => self.set_op(current, SetOp::Remove),
            FuncallName::SetIntersect => self.set_op(current, SetOp::Intersect),
            FuncallName::SetUnion => self.set_op(current, SetOp::Union),
            FuncallName::MapAdd => self.map_add(current),
            FuncallName::MapRemove => self.map_remove(current),
        }
    }

    fn list_push(&self, current: Option<&Value>, front: bool) -> Option<Value> {
        match (current, &self.arg1) {
            (Some(Value::ListString(l)), Some(Value::String(v))) => {
                Some(Value::ListString(pushed(l.clone(), v.clone(), front)))
            }
            (None, Some(Value::String(v))) => Some(Value::ListString(vec![v.clone()])),
            (Some(Value::ListInt64(l)), Some(Value::Int64(v))) => {
                Some(Value::ListInt64(pushed(l.clone(), *v, front)))
            }
            (None, Some(Value::Int64(v))) => Some(Value::ListInt64(vec![*v])),
            (Some(Value::ListFloat(l)), Some(Value::Float(v))) => {
                Some(Value::ListFloat(pushed(l.clone(), *v, front)))
            }
            (None, Some(Value::Float(v))) => Some(Value::ListFloat(vec![*v])),
            _ => None,
        }
    }

    fn set_op(&self, current: Option<&Value>, op: SetOp) -> Option<Value> {
        match (current, &self.arg1) {
            (cur, Some(Value::SetString(rhs))) => {
                let lhs = match cur {
                    Some(Value::SetString(l)) => l.clone(),
                    None => Vec::new(),
                    _ => return None,
                };
                let mut out = set_apply(lhs, rhs.clone(), op);
                out.sort();
                out.dedup();
                Some(Value::SetString(out))
            }
            (cur, Some(Value::SetInt64(rhs))) => {
                let lhs = match cur {
                    Some(Value::SetInt64(l)) => l.clone(),
                    None => Vec::new(),
                    _ => return None,
                };
                let mut out = set_apply(lhs, rhs.clone(), op);
                out.sort_unstable();
                out.dedup();
                Some(Value::SetInt64(out))
            }
            (cur, Some(Value::SetFloat(rhs))) => {
                let lhs = match cur {
                    Some(Value::SetFloat(l)) => l.clone(),
                    None => Vec::new(),
                    _ => return None,
                };
                let mut out = set_apply(lhs, rhs.clone(), op);
                out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                out.dedup_by(|a, b| a == b);
                Some(Value::SetFloat(out))
            }
            _ => None,
        }
    }

    fn map_add(&self, current: Option<&Value>) -> Option<Value> {
        match (current, &self.arg2, &self.arg1) {
            (cur, Some(Value::String(key)), Some(Value::String(val))) => {
                let mut m = match cur {
                    Some(Value::MapStringString(m)) => m.clone(),
                    None => Vec::new(),
                    _ => return None,
                };
                upsert(&mut m, key.clone(), val.clone());
                Some(Value::MapStringString(m))
            }
            (cur, Some(Value::String(key)), Some(Value::Int64(val))) => {
                let mut m = match cur {
                    Some(Value::MapStringInt64(m)) => m.clone(),
                    None => Vec::new(),
                    _ => return None,
                };
                upsert(&mut m, key.clone(), *val);
                Some(Value::MapStringInt64(m))
            }
            (cur, Some(Value::String(key)), Some(Value::Float(val))) => {
                let mut m = match cur {
                    Some(Value::MapStringFloat(m)) => m.clone(),
                    None => Vec::new(),
                    _ => return None,
                };
                upsert(&mut m, key.clone(), *val);
                Some(Value::MapStringFloat(m))
            }
            (cur, Some(Value::Int64(key)), Some(Value::String(val))) => {
                let mut m = match cur {
                    Some(Value::MapInt64String(m)) => m.clone(),
                    None => Vec::new(),
                    _ => return None,
                };
                upsert(&mut m, *key, val.clone());
                Some(Value::MapInt64String(m))
            }
            (cur, Some(Value::Int64(key)), Some(Value::Int64(val))) => {
                let mut m = match cur {
                    Some(Value::MapInt64Int64(m)) => m.clone(),
                    None => Vec::new(),
                    _ => return None,
                };
                upsert(&mut m, *key, *val);
                Some(Value::MapInt64Int64(m))
            }
            (cur, Some(Value::Int64(key)), Some(Value::Float(val))) => {
                let mut m = match cur {
                    Some(Value::MapInt64Float(m)) => m.clone(),
                    None => Vec::new(),
                    _ => return None,
                };
                upsert(&mut m, *key, *val);
                Some(Value::MapInt64Float(m))
            }
            _ => None,
        }
    }

    fn map_remove(&self, current: Option<&Value>) -> Option<Value> {
        match (current, &self.arg2) {
            (Some(Value::MapStringString(m)), Some(Value::String(k))) => {
                Some(Value::MapStringString(removed(m, k)))
            }
            (Some(Value::MapStringInt64(m)), Some(Value::String(k))) => {
                Some(Value::MapStringInt64(removed(m, k)))
            }
            (Some(Value::MapStringFloat(m)), Some(Value::String(k))) => {
                Some(Value::MapStringFloat(removed(m, k)))
            }
            (Some(Value::MapInt64String(m)), Some(Value::Int64(k))) => {
                Some(Value::MapInt64String(removed(m, k)))
            }
            (Some(Value::MapInt64Int64(m)), Some(Value::Int64(k))) => {
                Some(Value::MapInt64Int64(removed(m, k)))
            }
            (Some(Value::MapInt64Float(m)), Some(Value::Int64(k))) => {
                Some(Value::MapInt64Float(removed(m, k)))
            }
            (None, _) => current.cloned(),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
enum SetOp {
    Add,
    Remove,
    Intersect,
    Union,
}

fn set_apply<T: PartialEq + Clone>(lhs: Vec<T>, rhs: Vec<T>, op: SetOp) -> Vec<T> {
    match op {
        SetOp::Add => {
            let mut out = lhs;
            for item in rhs {
                if !out.contains(&item) {
                    out.push(item);
                }
            }
            out
        }
        SetOp::Remove => lhs.into_iter().filter(|x| !rhs.contains(x)).collect(),
        SetOp::Intersect => lhs.into_iter().filter(|x| rhs.contains(x)).collect(),
        SetOp::Union => {
            let mut out = lhs;
            for item in rhs {
                if !out.contains(&item) {
                    out.push(item);
                }
            }
            out
        }
    }
}

fn pushed<T>(mut list: Vec<T>, item: T, front: bool) -> Vec<T> {
    if front {
        list.insert(0, item);
    } else {
        list.push(item);
    }
    list
}

fn upsert<K: PartialEq, V>(m: &mut Vec<(K, V)>, key: K, value: V) {
    if let Some(entry) = m.iter_mut().find(|(k, _)| *k == key) {
        entry.1 = value;
    } else {
        m.push((key, value));
    }
}

fn removed<K: PartialEq + Clone, V: Clone>(m: &[(K, V)], key: &K) -> Vec<(K, V)> {
    m.iter().filter(|(k, _)| k != key).cloned().collect()
}

fn apply_numeric(name: FuncallName, current: Option<&Value>, arg: Option<&Value>) -> Option<Value> {
    match (current, arg) {
        (cur, Some(Value::Int64(rhs))) => {
            let lhs = match cur {
                Some(Value::Int64(l)) => *l,
                None => 0,
                _ => return None,
            };
            Some(Value::Int64(int_op(name, lhs, *rhs)?))
        }
        (cur, Some(Value::Float(rhs))) => {
            let lhs = match cur {
                Some(Value::Float(l)) => *l,
                None => 0.0,
                _ => return None,
            };
            Some(Value::Float(float_op(name, lhs, *rhs)?))
        }
        _ => None,
    }
}

fn int_op(name: FuncallName, lhs: i64, rhs: i64) -> Option<i64> {
    match name {
        FuncallName::NumAdd => lhs.checked_add(rhs),
        FuncallName::NumSub => lhs.checked_sub(rhs),
        FuncallName::NumMul => lhs.checked_mul(rhs),
        FuncallName::NumDiv => lhs.checked_div(rhs),
        FuncallName::NumMod => lhs.checked_rem(rhs),
        FuncallName::NumAnd => Some(lhs & rhs),
        FuncallName::NumOr => Some(lhs | rhs),
        FuncallName::NumXor => Some(lhs ^ rhs),
        _ => None,
    }
}

fn float_op(name: FuncallName, lhs: f64, rhs: f64) -> Option<f64> {
    match name {
        FuncallName::NumAdd => Some(lhs + rhs),
        FuncallName::NumSub => Some(lhs - rhs),
        FuncallName::NumMul => Some(lhs * rhs),
        FuncallName::NumDiv if rhs != 0.0 => Some(lhs / rhs),
        FuncallName::NumMod if rhs != 0.0 => Some(lhs % rhs),
        _ => None,
    }
}

/// Sorts funcalls by attribute (stable, so same-attribute funcalls keep
/// their relative order — the mutation primitives are not commutative).
pub fn sort_funcalls(funcalls: &mut [Funcall]) {
    funcalls.sort_by_key(|f| f.attr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_creates_value_from_none() {
        let f = Funcall::set(1, Value::Int64(42));
        assert_eq!(f.apply(None), Some(Value::Int64(42)));
    }

    #[test]
    fn numeric_add_on_missing_attribute_starts_from_zero() {
        let f = Funcall { attr: 1, name: FuncallName::NumAdd, arg1: Some(Value::Int64(5)), arg1_type: Some(DataType::Int64), arg2: None, arg2_type: None };
        assert_eq!(f.apply(None), Some(Value::Int64(5)));
        assert_eq!(f.apply(Some(&Value::Int64(10))), Some(Value::Int64(15)));
    }

    #[test]
    fn numeric_div_by_zero_fails() {
        let f = Funcall { attr: 1, name: FuncallName::NumDiv, arg1: Some(Value::Int64(0)), arg1_type: Some(DataType::Int64), arg2: None, arg2_type: None };
        assert_eq!(f.apply(Some(&Value::Int64(10))), None);
    }

    #[test]
    fn set_add_dedups_and_sorts() {
        let f = Funcall::set(1, Value::SetInt64(vec![3, 1]));
        let mut v = f.apply(None).unwrap();
        let add = Funcall { attr: 1, name: FuncallName::SetAdd, arg1: Some(Value::SetInt64(vec![2, 1])), arg1_type: Some(DataType::SetInt64), arg2: None, arg2_type: None };
        v = add.apply(Some(&v)).unwrap();
        assert_eq!(v, Value::SetInt64(vec![1, 2, 3]));
    }

    #[test]
    fn map_add_then_remove() {
        let add = Funcall::map_entry(1, FuncallName::MapAdd, Value::String(b"k".to_vec()), Value::Int64(7));
        let v = add.apply(None).unwrap();
        assert_eq!(v, Value::MapStringInt64(vec![(b"k".to_vec(), 7)]));
        let rm = Funcall { attr: 1, name: FuncallName::MapRemove, arg1: None, arg1_type: None, arg2: Some(Value::String(b"k".to_vec())), arg2_type: Some(DataType::String) };
        let v2 = rm.apply(Some(&v)).unwrap();
        assert_eq!(v2, Value::MapStringInt64(vec![]));
    }

    #[test]
    fn funcalls_sort_stable_by_attribute() {
        let mut fs = vec![
            Funcall::set(2, Value::Int64(1)),
            Funcall::set(1, Value::Int64(1)),
            Funcall { attr: 1, name: FuncallName::NumAdd, arg1: Some(Value::Int64(1)), arg1_type: Some(DataType::Int64), arg2: None, arg2_type: None },
        ];
        sort_funcalls(&mut fs);
        assert_eq!(fs[0].attr, 1);
        assert_eq!(fs[0].name, FuncallName::Set);
        assert_eq!(fs[1].name, FuncallName::NumAdd);
        assert_eq!(fs[2].attr, 2);
    }

    use test_case::test_case;

    fn int_funcall(name: FuncallName, rhs: i64) -> Funcall {
        Funcall { attr: 1, name, arg1: Some(Value::Int64(rhs)), arg1_type: Some(DataType::Int64), arg2: None, arg2_type: None }
    }

    #[test_case(FuncallName::NumAdd, 10, 3, Some(13); "add")]
    #[test_case(FuncallName::NumSub, 10, 3, Some(7); "sub")]
    #[test_case(FuncallName::NumMul, 10, 3, Some(30); "mul")]
    #[test_case(FuncallName::NumDiv, 10, 3, Some(3); "div_truncates")]
    #[test_case(FuncallName::NumMod, 10, 3, Some(1); "mod")]
    #[test_case(FuncallName::NumAnd, 0b1100, 0b1010, Some(0b1000); "bitwise_and")]
    #[test_case(FuncallName::NumOr, 0b1100, 0b1010, Some(0b1110); "bitwise_or")]
    #[test_case(FuncallName::NumXor, 0b1100, 0b1010, Some(0b0110); "bitwise_xor")]
    #[test_case(FuncallName::NumAdd, i64::MAX, 1, None; "add_overflow_fails")]
    #[test_case(FuncallName::NumDiv, 10, 0, None; "div_by_zero_fails")]
    #[test_case(FuncallName::NumMod, 10, 0, None; "mod_by_zero_fails")]
    fn int_numeric_funcalls_match_table(name: FuncallName, lhs: i64, rhs: i64, expect: Option<i64>) {
        let result = int_funcall(name, rhs).apply(Some(&Value::Int64(lhs)));
        assert_eq!(result, expect.map(Value::Int64));
    }

    use proptest::prelude::*;

    proptest! {
        /// Adding then subtracting the same operand is a no-op whenever
        /// neither step overflows `i64`.
        #[test]
        fn add_then_subtract_round_trips(lhs in any::<i64>(), rhs in any::<i64>()) {
            let Some(sum) = lhs.checked_add(rhs) else { return Ok(()) };
            let Some(_back) = sum.checked_sub(rhs) else { return Ok(()) };
            let added = int_funcall(FuncallName::NumAdd, rhs).apply(Some(&Value::Int64(lhs)));
            prop_assert_eq!(added.clone(), Some(Value::Int64(sum)));
            let restored = int_funcall(FuncallName::NumSub, rhs).apply(added.as_ref());
            prop_assert_eq!(restored, Some(Value::Int64(lhs)));
        }
    }
}
