//! Qualifier model: annotations, binding-member equality, and matching.
//!
//! Qualifiers discriminate between beans of the same type. Whether an
//! annotation is a qualifier is a closed tag fixed at construction time;
//! nothing here re-derives classification at resolution time.

use std::collections::BTreeMap;
use std::fmt;

use smallvec::SmallVec;

use crate::error::{OdiError, OdiResult};

pub(crate) const DEFAULT_NAME: &str = "Default";
pub(crate) const ANY_NAME: &str = "Any";
pub(crate) const NAMED_NAME: &str = "Named";

/// Member value of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MemberValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for MemberValue {
    fn from(v: bool) -> Self {
        MemberValue::Bool(v)
    }
}

impl From<i64> for MemberValue {
    fn from(v: i64) -> Self {
        MemberValue::Int(v)
    }
}

impl From<&str> for MemberValue {
    fn from(v: &str) -> Self {
        MemberValue::Str(v.to_string())
    }
}

impl From<String> for MemberValue {
    fn from(v: String) -> Self {
        MemberValue::Str(v)
    }
}

/// An annotation instance: a name, a member map, and a qualifier tag.
///
/// Members added with [`member`](Annotation::member) are binding and take part
/// in equality; members added with [`nonbinding_member`](Annotation::nonbinding_member)
/// are carried for diagnostics only and never affect matching.
///
/// # Examples
///
/// ```rust
/// use odi::Annotation;
///
/// let blue = Annotation::qualifier("Blue").member("shade", "dark");
/// assert_eq!(blue.name(), "Blue");
/// assert!(blue.is_qualifier());
///
/// // Non-qualifier annotations are rejected by QualifierSet::from_annotations.
/// let marker = Annotation::marker("Logged");
/// assert!(!marker.is_qualifier());
/// ```
#[derive(Debug, Clone)]
pub struct Annotation {
    name: &'static str,
    binding: BTreeMap<&'static str, MemberValue>,
    nonbinding: BTreeMap<&'static str, MemberValue>,
    qualifier: bool,
}

impl Annotation {
    /// Creates an annotation tagged as a qualifier type.
    pub fn qualifier(name: &'static str) -> Self {
        Self {
            name,
            binding: BTreeMap::new(),
            nonbinding: BTreeMap::new(),
            qualifier: true,
        }
    }

    /// Creates an annotation that is NOT a qualifier type.
    ///
    /// Passing one of these where a qualifier is expected fails with
    /// [`OdiError::InvalidQualifier`].
    pub fn marker(name: &'static str) -> Self {
        Self {
            name,
            binding: BTreeMap::new(),
            nonbinding: BTreeMap::new(),
            qualifier: false,
        }
    }

    /// The synthetic `@Default` qualifier.
    pub fn default_qualifier() -> Self {
        Self::qualifier(DEFAULT_NAME)
    }

    /// The synthetic `@Any` qualifier; matches every candidate.
    pub fn any() -> Self {
        Self::qualifier(ANY_NAME)
    }

    /// The `@Named` qualifier with its binding `value` member.
    pub fn named(value: &str) -> Self {
        Self::qualifier(NAMED_NAME).member("value", value)
    }

    /// Adds a binding member (participates in equality and matching).
    pub fn member(mut self, name: &'static str, value: impl Into<MemberValue>) -> Self {
        self.binding.insert(name, value.into());
        self
    }

    /// Adds a non-binding member (excluded from equality and matching).
    pub fn nonbinding_member(mut self, name: &'static str, value: impl Into<MemberValue>) -> Self {
        self.nonbinding.insert(name, value.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_qualifier(&self) -> bool {
        self.qualifier
    }
}

/// A validated qualifier: an annotation reduced to its binding members.
///
/// Equality and hashing use the annotation name and binding members only,
/// which is exactly what drives bean matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualifier {
    name: &'static str,
    members: BTreeMap<&'static str, MemberValue>,
}

impl Qualifier {
    fn from_annotation(annotation: Annotation) -> OdiResult<Self> {
        if !annotation.qualifier {
            return Err(OdiError::InvalidQualifier(format!(
                "annotation {} is not a qualifier type",
                annotation.name
            )));
        }
        Ok(Self {
            name: annotation.name,
            members: annotation.binding,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Binding member lookup, mostly useful in diagnostics.
    pub fn member(&self, name: &str) -> Option<&MemberValue> {
        self.members.get(name)
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.members.is_empty() {
            write!(f, "(")?;
            for (i, (k, v)) in self.members.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}={:?}", k, v)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// An order-irrelevant set of qualifiers, at most one per annotation type.
///
/// The empty set stands for the implicit `@Default` request. On the declared
/// side, a bean has default status when it declares no explicit qualifier
/// other than `@Named`.
///
/// # Examples
///
/// ```rust
/// use odi::{Annotation, QualifierSet};
///
/// let requested = QualifierSet::from_annotations([Annotation::qualifier("Blue")]).unwrap();
/// let declared = QualifierSet::from_annotations([
///     Annotation::qualifier("Blue"),
///     Annotation::named("primary"),
/// ]).unwrap();
/// assert!(declared.satisfies(&requested));
///
/// // Duplicate qualifier types per lookup are forbidden.
/// let dup = QualifierSet::from_annotations([
///     Annotation::qualifier("Blue"),
///     Annotation::qualifier("Blue").member("shade", "light"),
/// ]);
/// assert!(dup.is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualifierSet {
    // Sorted by name; duplicates rejected at construction.
    quals: SmallVec<[Qualifier; 2]>,
}

impl QualifierSet {
    /// The empty set, treated as an implicit `@Default` request.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a set from annotation instances.
    ///
    /// Fails with [`OdiError::InvalidQualifier`] if an annotation is not a
    /// qualifier type, or if the same annotation type appears twice (even
    /// with different members).
    pub fn from_annotations(
        annotations: impl IntoIterator<Item = Annotation>,
    ) -> OdiResult<Self> {
        let mut set = Self::default();
        for annotation in annotations {
            set.insert(Qualifier::from_annotation(annotation)?)?;
        }
        Ok(set)
    }

    fn insert(&mut self, qualifier: Qualifier) -> OdiResult<()> {
        match self.quals.binary_search_by(|q| q.name.cmp(qualifier.name)) {
            Ok(_) => Err(OdiError::InvalidQualifier(format!(
                "duplicate qualifier type @{}",
                qualifier.name
            ))),
            Err(pos) => {
                self.quals.insert(pos, qualifier);
                Ok(())
            }
        }
    }

    /// Union of two sets; a qualifier type present in both is an error.
    pub fn merge(&self, other: &QualifierSet) -> OdiResult<Self> {
        let mut merged = self.clone();
        for q in &other.quals {
            merged.insert(q.clone())?;
        }
        Ok(merged)
    }

    pub fn len(&self) -> usize {
        self.quals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.quals.iter()
    }

    fn get(&self, name: &str) -> Option<&Qualifier> {
        self.quals
            .binary_search_by(|q| q.name.cmp(name))
            .ok()
            .map(|pos| &self.quals[pos])
    }

    /// Declared-side default status: no explicit qualifier other than `@Named`
    /// (an explicit `@Default` also counts).
    pub fn has_default_status(&self) -> bool {
        self.quals
            .iter()
            .all(|q| matches!(q.name, DEFAULT_NAME | ANY_NAME | NAMED_NAME))
            || self.get(DEFAULT_NAME).is_some()
    }

    /// Whether this declared set satisfies the `requested` set.
    ///
    /// Every requested qualifier must be present here by binding-member
    /// equality; `@Any` always matches, and an empty or `@Default` request
    /// matches any candidate with default status.
    pub fn satisfies(&self, requested: &QualifierSet) -> bool {
        if requested.is_empty() {
            return self.has_default_status();
        }
        requested.quals.iter().all(|req| match req.name {
            ANY_NAME => true,
            DEFAULT_NAME => self.has_default_status(),
            _ => self.get(req.name).is_some_and(|own| own == req),
        })
    }
}
