//! Dynamic payload values carried by actions, effects and subscriptions.
//!
//! Payloads are compared with an identity rule rather than deep equality:
//! scalars and text by value, containers and opaque host values by
//! allocation. Subscription payloads are additionally compared field by
//! field, ignoring fields that hold callables (see [`compare`]).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::action::Action;

/// A value passed alongside a dispatch, an effect or a subscription.
pub enum Payload<S> {
    /// No payload.
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Arc<str>),
    List(Arc<[Payload<S>]>),
    Record(Record<S>),
    /// A callable field, e.g. the action a subscriber dispatches.
    Action(Action<S>),
    /// Any host value; compared by allocation.
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl<S> Payload<S> {
    /// Build a record payload from `(key, value)` pairs.
    pub fn record<K, V, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Arc<str>>,
        V: Into<Payload<S>>,
    {
        Payload::Record(fields.into_iter().collect())
    }

    pub fn list<V, I>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Payload<S>>,
    {
        Payload::List(items.into_iter().map(Into::into).collect())
    }

    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Payload::Opaque(Arc::new(value))
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Payload::Unit)
    }

    /// True for an action, or a list whose head is an action.
    pub fn is_callable(&self) -> bool {
        match self {
            Payload::Action(_) => true,
            Payload::List(items) => matches!(items.first(), Some(Payload::Action(_))),
            _ => false,
        }
    }

    /// Identity comparison.
    ///
    /// `Int` and `Float` compare numerically, `NaN` never equals itself,
    /// text compares by content, everything else by allocation.
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Payload::Unit, Payload::Unit) => true,
            (Payload::Bool(a), Payload::Bool(b)) => a == b,
            (Payload::Int(a), Payload::Int(b)) => a == b,
            (Payload::Float(a), Payload::Float(b)) => a == b,
            (Payload::Int(a), Payload::Float(b)) | (Payload::Float(b), Payload::Int(a)) => {
                *a as f64 == *b
            }
            (Payload::Text(a), Payload::Text(b)) => a == b,
            (Payload::List(a), Payload::List(b)) => Arc::ptr_eq(a, b),
            (Payload::Record(a), Payload::Record(b)) => a.ptr_eq(b),
            (Payload::Action(a), Payload::Action(b)) => a.ptr_eq(b),
            (Payload::Opaque(a), Payload::Opaque(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }

    /// Field lookup on a record payload.
    pub fn get(&self, key: &str) -> Option<&Payload<S>> {
        self.as_record().and_then(|record| record.get(key))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Payload::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Payload::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Payload::Float(value) => Some(*value),
            Payload::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Payload<S>]> {
        match self {
            Payload::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record<S>> {
        match self {
            Payload::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&Action<S>> {
        match self {
            Payload::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Payload::Opaque(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl<S> Clone for Payload<S> {
    fn clone(&self) -> Self {
        match self {
            Payload::Unit => Payload::Unit,
            Payload::Bool(value) => Payload::Bool(*value),
            Payload::Int(value) => Payload::Int(*value),
            Payload::Float(value) => Payload::Float(*value),
            Payload::Text(value) => Payload::Text(Arc::clone(value)),
            Payload::List(items) => Payload::List(Arc::clone(items)),
            Payload::Record(record) => Payload::Record(record.clone()),
            Payload::Action(action) => Payload::Action(action.clone()),
            Payload::Opaque(value) => Payload::Opaque(Arc::clone(value)),
        }
    }
}

impl<S> Default for Payload<S> {
    fn default() -> Self {
        Payload::Unit
    }
}

impl<S> fmt::Debug for Payload<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Unit => f.write_str("Unit"),
            Payload::Bool(value) => write!(f, "{value}"),
            Payload::Int(value) => write!(f, "{value}"),
            Payload::Float(value) => write!(f, "{value}"),
            Payload::Text(value) => write!(f, "{value:?}"),
            Payload::List(items) => f.debug_list().entries(items.iter()).finish(),
            Payload::Record(record) => fmt::Debug::fmt(record, f),
            Payload::Action(action) => write!(f, "<action {}>", action.name()),
            Payload::Opaque(_) => f.write_str("<opaque>"),
        }
    }
}

impl<S> From<()> for Payload<S> {
    fn from(_: ()) -> Self {
        Payload::Unit
    }
}

impl<S> From<bool> for Payload<S> {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}

impl<S> From<i64> for Payload<S> {
    fn from(value: i64) -> Self {
        Payload::Int(value)
    }
}

impl<S> From<i32> for Payload<S> {
    fn from(value: i32) -> Self {
        Payload::Int(i64::from(value))
    }
}

impl<S> From<u32> for Payload<S> {
    fn from(value: u32) -> Self {
        Payload::Int(i64::from(value))
    }
}

impl<S> From<f64> for Payload<S> {
    fn from(value: f64) -> Self {
        Payload::Float(value)
    }
}

impl<S> From<&str> for Payload<S> {
    fn from(value: &str) -> Self {
        Payload::Text(Arc::from(value))
    }
}

impl<S> From<String> for Payload<S> {
    fn from(value: String) -> Self {
        Payload::Text(Arc::from(value))
    }
}

impl<S> From<Record<S>> for Payload<S> {
    fn from(record: Record<S>) -> Self {
        Payload::Record(record)
    }
}

impl<S> From<Action<S>> for Payload<S> {
    fn from(action: Action<S>) -> Self {
        Payload::Action(action)
    }
}

impl<S> From<Vec<Payload<S>>> for Payload<S> {
    fn from(items: Vec<Payload<S>>) -> Self {
        Payload::List(items.into())
    }
}

/// Host events frequently arrive as JSON; objects keep their map order.
impl<S> From<serde_json::Value> for Payload<S> {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Payload::Unit,
            Value::Bool(value) => Payload::Bool(value),
            Value::Number(number) => match number.as_i64() {
                Some(value) => Payload::Int(value),
                None => Payload::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(value) => Payload::Text(Arc::from(value)),
            Value::Array(items) => Payload::list(items),
            Value::Object(map) => Payload::record(map),
        }
    }
}

/// Ordered, string-keyed fields. Cloning shares the allocation, so a clone
/// is the same record under [`Payload::same`].
pub struct Record<S> {
    fields: Arc<[(Arc<str>, Payload<S>)]>,
}

impl<S> Record<S> {
    pub fn get(&self, key: &str) -> Option<&Payload<S>> {
        self.fields
            .iter()
            .find(|(name, _)| &**name == key)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|(name, _)| &**name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Payload<S>)> + '_ {
        self.fields.iter().map(|(name, value)| (&**name, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.fields, &other.fields)
    }
}

impl<S> Clone for Record<S> {
    fn clone(&self) -> Self {
        Self {
            fields: Arc::clone(&self.fields),
        }
    }
}

impl<S> fmt::Debug for Record<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Later duplicates overwrite the value but keep the first position.
impl<S, K, V> FromIterator<(K, V)> for Record<S>
where
    K: Into<Arc<str>>,
    V: Into<Payload<S>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields: Vec<(Arc<str>, Payload<S>)> = Vec::new();
        for (key, value) in iter {
            let key = key.into();
            let value = value.into();
            match fields.iter().position(|(name, _)| *name == key) {
                Some(index) => fields[index].1 = value,
                None => fields.push((key, value)),
            }
        }
        Self {
            fields: fields.into(),
        }
    }
}

/// Outcome of comparing an old subscription payload with a new one.
#[derive(Debug)]
pub struct PayloadComparison<S> {
    /// Whether the difference alone warrants restarting the subscription.
    pub differs: bool,
    /// The new payload with callable fields replaced by the old values
    /// visited before the comparison concluded. A restarted subscription
    /// starts with this payload.
    pub normalized: Payload<S>,
}

/// Compare two subscription payloads.
///
/// Both sides are walked field by field: record fields by name, list
/// elements by index. Fields of `old` come first, in order, then fields
/// only present in `new`. A field whose old value is callable counts as
/// equal and is copied into the normalized payload. The first other field
/// that differs under [`Payload::same`] ends the walk. Missing fields are
/// [`Payload::Unit`].
///
/// Scalars, text, actions and opaque values have no fields, so a pair of
/// them never differs. Neither input is modified.
pub fn compare<S>(old: &Payload<S>, new: &Payload<S>) -> PayloadComparison<S> {
    let mut keys = fields_of(old);
    keys.extend(
        fields_of(new)
            .into_iter()
            .filter(|key| field(old, key).is_none()),
    );

    // Copy-on-write: untouched comparisons hand back `new` itself.
    let mut draft: Option<Draft<S>> = None;
    let mut differs = false;

    for key in &keys {
        let before = field(old, key);
        if let Some(callable) = before.filter(|value| value.is_callable()) {
            if draft.is_none() {
                draft = Draft::of(new);
            }
            if let Some(draft) = draft.as_mut() {
                draft.set(key, callable.clone());
            }
            continue;
        }
        if !field_same(before, field(new, key)) {
            differs = true;
            break;
        }
    }

    PayloadComparison {
        differs,
        normalized: draft.map_or_else(|| new.clone(), Draft::finish),
    }
}

#[derive(Debug)]
enum Key {
    Name(Arc<str>),
    Index(usize),
}

fn fields_of<S>(payload: &Payload<S>) -> Vec<Key> {
    match payload {
        Payload::Record(record) => record
            .fields
            .iter()
            .map(|(name, _)| Key::Name(Arc::clone(name)))
            .collect(),
        Payload::List(items) => (0..items.len()).map(Key::Index).collect(),
        _ => Vec::new(),
    }
}

fn field<'a, S>(payload: &'a Payload<S>, key: &Key) -> Option<&'a Payload<S>> {
    match (payload, key) {
        (Payload::Record(record), Key::Name(name)) => record.get(name),
        (Payload::List(items), Key::Index(index)) => items.get(*index),
        _ => None,
    }
}

fn field_same<S>(old: Option<&Payload<S>>, new: Option<&Payload<S>>) -> bool {
    match (old, new) {
        (Some(a), Some(b)) => a.same(b),
        (Some(value), None) | (None, Some(value)) => value.is_unit(),
        (None, None) => true,
    }
}

/// Mutable copy of a container payload.
enum Draft<S> {
    Record(Vec<(Arc<str>, Payload<S>)>),
    List(Vec<Payload<S>>),
}

impl<S> Draft<S> {
    fn of(payload: &Payload<S>) -> Option<Self> {
        match payload {
            Payload::Record(record) => Some(Draft::Record(record.fields.to_vec())),
            Payload::List(items) => Some(Draft::List(items.to_vec())),
            _ => None,
        }
    }

    /// A key of the other container kind has nowhere to go and is dropped.
    fn set(&mut self, key: &Key, value: Payload<S>) {
        match (self, key) {
            (Draft::Record(fields), Key::Name(name)) => {
                match fields.iter().position(|(field, _)| field == name) {
                    Some(index) => fields[index].1 = value,
                    None => fields.push((Arc::clone(name), value)),
                }
            }
            (Draft::List(items), Key::Index(index)) => {
                if *index >= items.len() {
                    items.resize_with(index + 1, Payload::default);
                }
                items[*index] = value;
            }
            _ => {}
        }
    }

    fn finish(self) -> Payload<S> {
        match self {
            Draft::Record(fields) => Payload::Record(Record {
                fields: fields.into(),
            }),
            Draft::List(items) => Payload::List(items.into()),
        }
    }
}
