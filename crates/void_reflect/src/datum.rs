//! Datum - a runtime-typed, resizable array of values
//!
//! A datum holds zero or more elements of exactly one [`DatumType`]. The type
//! is fixed the first time it is set and never changes afterwards. Storage is
//! either owned by the datum or a view over a [`Member`] owned by a reflected
//! object; a view can shrink and re-grow within the member's length but never
//! reallocates.

use crate::error::{ReflectError, Result};
use crate::member::Member;
use crate::scope::ScopeId;
use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use void_core::Rtti;

use self::sealed::Element;
use self::storage::{Buffer, ExternalView, Values};

/// Element type of a datum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatumType {
    /// Not yet assigned
    #[default]
    Unknown,
    /// `i32`
    Integer,
    /// `f32`
    Float,
    /// `glam::Vec4`
    Vector,
    /// `glam::Mat4`
    Matrix,
    /// `String`
    String,
    /// Child scopes
    Table,
    /// Reference to an RTTI object
    Pointer,
    /// Reference to another datum
    Reference,
}

impl DatumType {
    /// Every concrete type, in declaration order
    pub const ALL: [DatumType; 8] = [
        DatumType::Integer,
        DatumType::Float,
        DatumType::Vector,
        DatumType::Matrix,
        DatumType::String,
        DatumType::Table,
        DatumType::Pointer,
        DatumType::Reference,
    ];

    /// Lowercase name, as used in JSON documents
    pub const fn name(self) -> &'static str {
        match self {
            DatumType::Unknown => "unknown",
            DatumType::Integer => "integer",
            DatumType::Float => "float",
            DatumType::Vector => "vector",
            DatumType::Matrix => "matrix",
            DatumType::String => "string",
            DatumType::Table => "table",
            DatumType::Pointer => "pointer",
            DatumType::Reference => "reference",
        }
    }

    /// Whether a datum of this type can view member storage
    pub const fn supports_external(self) -> bool {
        !matches!(self, DatumType::Unknown | DatumType::Table)
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatumType {
    type Err = ReflectError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        std::iter::once(DatumType::Unknown)
            .chain(DatumType::ALL)
            .find(|t| t.name() == lower)
            .ok_or_else(|| ReflectError::InvalidArgument(format!("unknown datum type '{}'", s)))
    }
}

/// Growth policy: `(required size, current capacity) -> new capacity`
pub type ReserveStrategy = fn(usize, usize) -> usize;

/// Doubles the capacity, never returning less than the required size
pub fn default_reserve_strategy(size: usize, capacity: usize) -> usize {
    size.max(capacity.saturating_mul(2)).max(1)
}

/// Nullable reference to an RTTI object
#[derive(Clone, Default)]
pub struct RttiRef(Option<Rc<dyn Rtti>>);

impl RttiRef {
    /// Reference an object
    pub fn new(object: Rc<dyn Rtti>) -> Self {
        Self(Some(object))
    }

    /// Null reference
    pub fn null() -> Self {
        Self(None)
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Borrow the referenced object
    pub fn get(&self) -> Option<&dyn Rtti> {
        self.0.as_deref()
    }

    /// Shared handle to the referenced object
    pub fn to_rc(&self) -> Option<Rc<dyn Rtti>> {
        self.0.clone()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => std::ptr::eq(
                Rc::as_ptr(a) as *const (),
                Rc::as_ptr(b) as *const (),
            ),
            (None, None) => true,
            _ => false,
        }
    }
}

impl PartialEq for RttiRef {
    /// Delegates to the pointee's `equals`
    fn eq(&self, other: &Self) -> bool {
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => a.equals(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for RttiRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(object) => write!(f, "RttiRef({})", object.rtti_name()),
            None => write!(f, "RttiRef(null)"),
        }
    }
}

impl<T: Rtti> From<Rc<T>> for RttiRef {
    fn from(object: Rc<T>) -> Self {
        Self(Some(object))
    }
}

/// Nullable reference to a named attribute of a scope
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DatumRef(Option<(ScopeId, String)>);

impl DatumRef {
    /// Reference `key` in `scope`
    pub fn new(scope: ScopeId, key: impl Into<String>) -> Self {
        Self(Some((scope, key.into())))
    }

    /// Null reference
    pub fn null() -> Self {
        Self(None)
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// Target scope
    pub fn scope(&self) -> Option<ScopeId> {
        self.0.as_ref().map(|(scope, _)| *scope)
    }

    /// Target attribute name
    pub fn key(&self) -> Option<&str> {
        self.0.as_ref().map(|(_, key)| key.as_str())
    }
}

/// Types that can be stored in a datum
pub trait DatumElement: Element + Clone + Default + PartialEq + 'static {
    /// The datum type this element maps to
    const DATUM_TYPE: DatumType;
}

mod sealed {
    use super::storage::{Buffer, ExternalView, Values};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Per-type plumbing between the tagged storage and a concrete element
    pub trait Element: Sized + Clone + Default + PartialEq + 'static {
        const TYPE: super::DatumType;

        fn buffer(values: &Values) -> Option<&Buffer<Self>>;
        fn buffer_mut(values: &mut Values) -> Option<&mut Buffer<Self>>;
        fn wrap(buffer: Buffer<Self>) -> Values;
        fn external(cells: Rc<RefCell<Vec<Self>>>) -> Option<ExternalView>;
        fn unwrap_external(view: ExternalView) -> Option<Rc<RefCell<Vec<Self>>>>;

        /// Text form of one element
        fn format(&self) -> String;

        /// Parse one element. `None` means unparseable; `Some(None)` means the
        /// type ignores text input.
        fn parse(text: &str) -> Option<Option<Self>>;
    }
}

pub(crate) mod storage {
    use super::{DatumRef, RttiRef, ReserveStrategy};
    use crate::scope::ScopeId;
    use glam::{Mat4, Vec4};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Owned buffer or view over member storage
    pub enum Buffer<T> {
        Owned {
            items: Vec<T>,
            capacity: usize,
        },
        View {
            cells: Rc<RefCell<Vec<T>>>,
            size: usize,
            capacity: usize,
        },
    }

    /// Tagged element storage
    pub enum Values {
        Unknown,
        Integer(Buffer<i32>),
        Float(Buffer<f32>),
        Vector(Buffer<Vec4>),
        Matrix(Buffer<Mat4>),
        String(Buffer<String>),
        Table(Buffer<ScopeId>),
        Pointer(Buffer<RttiRef>),
        Reference(Buffer<DatumRef>),
    }

    /// Type-erased member storage produced by a signature accessor
    pub enum ExternalView {
        Integer(Rc<RefCell<Vec<i32>>>),
        Float(Rc<RefCell<Vec<f32>>>),
        Vector(Rc<RefCell<Vec<Vec4>>>),
        Matrix(Rc<RefCell<Vec<Mat4>>>),
        String(Rc<RefCell<Vec<String>>>),
        Pointer(Rc<RefCell<Vec<RttiRef>>>),
        Reference(Rc<RefCell<Vec<DatumRef>>>),
    }

    impl ExternalView {
        pub fn len(&self) -> usize {
            match self {
                ExternalView::Integer(c) => c.borrow().len(),
                ExternalView::Float(c) => c.borrow().len(),
                ExternalView::Vector(c) => c.borrow().len(),
                ExternalView::Matrix(c) => c.borrow().len(),
                ExternalView::String(c) => c.borrow().len(),
                ExternalView::Pointer(c) => c.borrow().len(),
                ExternalView::Reference(c) => c.borrow().len(),
            }
        }

        pub fn datum_type(&self) -> super::DatumType {
            use super::DatumType;
            match self {
                ExternalView::Integer(_) => DatumType::Integer,
                ExternalView::Float(_) => DatumType::Float,
                ExternalView::Vector(_) => DatumType::Vector,
                ExternalView::Matrix(_) => DatumType::Matrix,
                ExternalView::String(_) => DatumType::String,
                ExternalView::Pointer(_) => DatumType::Pointer,
                ExternalView::Reference(_) => DatumType::Reference,
            }
        }
    }

    impl<T: Clone + Default + PartialEq> Buffer<T> {
        pub fn new() -> Self {
            Buffer::Owned {
                items: Vec::new(),
                capacity: 0,
            }
        }

        pub fn with_capacity(capacity: usize) -> Self {
            Buffer::Owned {
                items: Vec::with_capacity(capacity),
                capacity,
            }
        }

        pub fn view(cells: Rc<RefCell<Vec<T>>>, size: usize, capacity: usize) -> Self {
            Buffer::View {
                cells,
                size,
                capacity,
            }
        }

        pub fn len(&self) -> usize {
            match self {
                Buffer::Owned { items, .. } => items.len(),
                Buffer::View { size, .. } => *size,
            }
        }

        pub fn capacity(&self) -> usize {
            match self {
                Buffer::Owned { capacity, .. } | Buffer::View { capacity, .. } => *capacity,
            }
        }

        pub fn is_view(&self) -> bool {
            matches!(self, Buffer::View { .. })
        }

        pub fn with_slice<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
            match self {
                Buffer::Owned { items, .. } => f(items),
                Buffer::View { cells, size, .. } => f(&cells.borrow()[..*size]),
            }
        }

        pub fn get(&self, index: usize) -> Option<T> {
            self.with_slice(|s| s.get(index).cloned())
        }

        pub fn set(&mut self, index: usize, value: T) -> bool {
            match self {
                Buffer::Owned { items, .. } => match items.get_mut(index) {
                    Some(slot) => {
                        *slot = value;
                        true
                    }
                    None => false,
                },
                Buffer::View { cells, size, .. } => {
                    if index >= *size {
                        return false;
                    }
                    cells.borrow_mut()[index] = value;
                    true
                }
            }
        }

        /// Grow owned capacity; views only accept requests they already satisfy
        pub fn reserve(&mut self, requested: usize) -> bool {
            match self {
                Buffer::Owned { items, capacity } => {
                    if requested > *capacity {
                        items.reserve_exact(requested - items.len());
                        *capacity = requested;
                    }
                    true
                }
                Buffer::View { capacity, .. } => requested <= *capacity,
            }
        }

        pub fn resize(&mut self, new_size: usize) -> bool {
            match self {
                Buffer::Owned { items, capacity } => {
                    if new_size > *capacity {
                        items.reserve_exact(new_size - items.len());
                        *capacity = new_size;
                    }
                    items.resize(new_size, T::default());
                    true
                }
                Buffer::View { size, capacity, .. } => {
                    if new_size > *capacity {
                        return false;
                    }
                    *size = new_size;
                    true
                }
            }
        }

        pub fn push(&mut self, value: T, strategy: ReserveStrategy) -> bool {
            match self {
                Buffer::Owned { items, capacity } => {
                    if items.len() == *capacity {
                        let required = items.len() + 1;
                        let grown = strategy(required, *capacity).max(required);
                        items.reserve_exact(grown - items.len());
                        *capacity = grown;
                    }
                    items.push(value);
                    true
                }
                Buffer::View {
                    cells,
                    size,
                    capacity,
                } => {
                    if *size >= *capacity {
                        return false;
                    }
                    cells.borrow_mut()[*size] = value;
                    *size += 1;
                    true
                }
            }
        }

        pub fn pop(&mut self) -> Option<T> {
            match self {
                Buffer::Owned { items, .. } => items.pop(),
                Buffer::View { cells, size, .. } => {
                    if *size == 0 {
                        return None;
                    }
                    *size -= 1;
                    Some(cells.borrow()[*size].clone())
                }
            }
        }

        pub fn remove_at(&mut self, index: usize) -> Option<T> {
            match self {
                Buffer::Owned { items, .. } => (index < items.len()).then(|| items.remove(index)),
                Buffer::View { cells, size, .. } => {
                    if index >= *size {
                        return None;
                    }
                    let mut cells = cells.borrow_mut();
                    cells[index..*size].rotate_left(1);
                    *size -= 1;
                    Some(cells[*size].clone())
                }
            }
        }

        pub fn clear(&mut self) {
            match self {
                Buffer::Owned { items, .. } => items.clear(),
                Buffer::View { size, .. } => *size = 0,
            }
        }

        pub fn shrink_to_fit(&mut self) -> bool {
            match self {
                Buffer::Owned { items, capacity } => {
                    items.shrink_to_fit();
                    *capacity = items.len();
                    true
                }
                Buffer::View { .. } => false,
            }
        }

        pub fn position(&self, value: &T) -> Option<usize> {
            self.with_slice(|s| s.iter().position(|v| v == value))
        }

        pub fn to_vec(&self) -> Vec<T> {
            self.with_slice(|s| s.to_vec())
        }

        pub fn elements_eq(&self, other: &Self) -> bool {
            self.with_slice(|a| other.with_slice(|b| a == b))
        }

        /// Empty owned buffer keeping the current capacity
        pub fn empty_like(&self) -> Self {
            Self::with_capacity(self.capacity())
        }
    }

    impl<T: Clone> Clone for Buffer<T> {
        /// Owned buffers are deep-copied; views alias the same member
        fn clone(&self) -> Self {
            match self {
                Buffer::Owned { items, capacity } => {
                    let mut copy = Vec::with_capacity(*capacity);
                    copy.extend(items.iter().cloned());
                    Buffer::Owned {
                        items: copy,
                        capacity: *capacity,
                    }
                }
                Buffer::View {
                    cells,
                    size,
                    capacity,
                } => Buffer::View {
                    cells: Rc::clone(cells),
                    size: *size,
                    capacity: *capacity,
                },
            }
        }
    }

    impl Clone for Values {
        fn clone(&self) -> Self {
            match self {
                Values::Unknown => Values::Unknown,
                Values::Integer(b) => Values::Integer(b.clone()),
                Values::Float(b) => Values::Float(b.clone()),
                Values::Vector(b) => Values::Vector(b.clone()),
                Values::Matrix(b) => Values::Matrix(b.clone()),
                Values::String(b) => Values::String(b.clone()),
                Values::Table(b) => Values::Table(b.clone()),
                Values::Pointer(b) => Values::Pointer(b.clone()),
                Values::Reference(b) => Values::Reference(b.clone()),
            }
        }
    }
}

/// Run `$body` against whichever typed buffer `$values` holds
macro_rules! with_buffer {
    ($values:expr, $buf:ident => $body:expr, unknown => $unknown:expr) => {
        match $values {
            Values::Unknown => $unknown,
            Values::Integer($buf) => $body,
            Values::Float($buf) => $body,
            Values::Vector($buf) => $body,
            Values::Matrix($buf) => $body,
            Values::String($buf) => $body,
            Values::Table($buf) => $body,
            Values::Pointer($buf) => $body,
            Values::Reference($buf) => $body,
        }
    };
}

macro_rules! impl_datum_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl DatumElement for $ty {
                const DATUM_TYPE: DatumType = DatumType::$variant;
            }

            impl From<$ty> for Datum {
                fn from(value: $ty) -> Self {
                    Datum::from_elements(vec![value])
                }
            }

            impl From<Vec<$ty>> for Datum {
                fn from(values: Vec<$ty>) -> Self {
                    Datum::from_elements(values)
                }
            }
        )*
    };
}

impl Element for i32 {
    const TYPE: DatumType = DatumType::Integer;

    fn buffer(values: &Values) -> Option<&Buffer<Self>> {
        match values {
            Values::Integer(b) => Some(b),
            _ => None,
        }
    }

    fn buffer_mut(values: &mut Values) -> Option<&mut Buffer<Self>> {
        match values {
            Values::Integer(b) => Some(b),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> Values {
        Values::Integer(buffer)
    }

    fn external(cells: Rc<RefCell<Vec<Self>>>) -> Option<ExternalView> {
        Some(ExternalView::Integer(cells))
    }

    fn unwrap_external(view: ExternalView) -> Option<Rc<RefCell<Vec<Self>>>> {
        match view {
            ExternalView::Integer(c) => Some(c),
            _ => None,
        }
    }

    fn format(&self) -> String {
        self.to_string()
    }

    fn parse(text: &str) -> Option<Option<Self>> {
        text.trim().parse().ok().map(Some)
    }
}

impl Element for f32 {
    const TYPE: DatumType = DatumType::Float;

    fn buffer(values: &Values) -> Option<&Buffer<Self>> {
        match values {
            Values::Float(b) => Some(b),
            _ => None,
        }
    }

    fn buffer_mut(values: &mut Values) -> Option<&mut Buffer<Self>> {
        match values {
            Values::Float(b) => Some(b),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> Values {
        Values::Float(buffer)
    }

    fn external(cells: Rc<RefCell<Vec<Self>>>) -> Option<ExternalView> {
        Some(ExternalView::Float(cells))
    }

    fn unwrap_external(view: ExternalView) -> Option<Rc<RefCell<Vec<Self>>>> {
        match view {
            ExternalView::Float(c) => Some(c),
            _ => None,
        }
    }

    fn format(&self) -> String {
        self.to_string()
    }

    fn parse(text: &str) -> Option<Option<Self>> {
        text.trim().parse().ok().map(Some)
    }
}

impl Element for Vec4 {
    const TYPE: DatumType = DatumType::Vector;

    fn buffer(values: &Values) -> Option<&Buffer<Self>> {
        match values {
            Values::Vector(b) => Some(b),
            _ => None,
        }
    }

    fn buffer_mut(values: &mut Values) -> Option<&mut Buffer<Self>> {
        match values {
            Values::Vector(b) => Some(b),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> Values {
        Values::Vector(buffer)
    }

    fn external(cells: Rc<RefCell<Vec<Self>>>) -> Option<ExternalView> {
        Some(ExternalView::Vector(cells))
    }

    fn unwrap_external(view: ExternalView) -> Option<Rc<RefCell<Vec<Self>>>> {
        match view {
            ExternalView::Vector(c) => Some(c),
            _ => None,
        }
    }

    fn format(&self) -> String {
        format!("vec4({}, {}, {}, {})", self.x, self.y, self.z, self.w)
    }

    fn parse(text: &str) -> Option<Option<Self>> {
        parse_components::<4>(text).map(|c| Some(Vec4::from_array(c)))
    }
}

impl Element for Mat4 {
    const TYPE: DatumType = DatumType::Matrix;

    fn buffer(values: &Values) -> Option<&Buffer<Self>> {
        match values {
            Values::Matrix(b) => Some(b),
            _ => None,
        }
    }

    fn buffer_mut(values: &mut Values) -> Option<&mut Buffer<Self>> {
        match values {
            Values::Matrix(b) => Some(b),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> Values {
        Values::Matrix(buffer)
    }

    fn external(cells: Rc<RefCell<Vec<Self>>>) -> Option<ExternalView> {
        Some(ExternalView::Matrix(cells))
    }

    fn unwrap_external(view: ExternalView) -> Option<Rc<RefCell<Vec<Self>>>> {
        match view {
            ExternalView::Matrix(c) => Some(c),
            _ => None,
        }
    }

    fn format(&self) -> String {
        let columns: Vec<String> = self
            .to_cols_array_2d()
            .iter()
            .map(|c| format!("({}, {}, {}, {})", c[0], c[1], c[2], c[3]))
            .collect();
        format!("mat4x4({})", columns.join(", "))
    }

    fn parse(text: &str) -> Option<Option<Self>> {
        parse_components::<16>(text).map(|c| Some(Mat4::from_cols_array(&c)))
    }
}

impl Element for String {
    const TYPE: DatumType = DatumType::String;

    fn buffer(values: &Values) -> Option<&Buffer<Self>> {
        match values {
            Values::String(b) => Some(b),
            _ => None,
        }
    }

    fn buffer_mut(values: &mut Values) -> Option<&mut Buffer<Self>> {
        match values {
            Values::String(b) => Some(b),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> Values {
        Values::String(buffer)
    }

    fn external(cells: Rc<RefCell<Vec<Self>>>) -> Option<ExternalView> {
        Some(ExternalView::String(cells))
    }

    fn unwrap_external(view: ExternalView) -> Option<Rc<RefCell<Vec<Self>>>> {
        match view {
            ExternalView::String(c) => Some(c),
            _ => None,
        }
    }

    fn format(&self) -> String {
        self.clone()
    }

    fn parse(text: &str) -> Option<Option<Self>> {
        Some(Some(text.to_string()))
    }
}

impl Element for ScopeId {
    const TYPE: DatumType = DatumType::Table;

    fn buffer(values: &Values) -> Option<&Buffer<Self>> {
        match values {
            Values::Table(b) => Some(b),
            _ => None,
        }
    }

    fn buffer_mut(values: &mut Values) -> Option<&mut Buffer<Self>> {
        match values {
            Values::Table(b) => Some(b),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> Values {
        Values::Table(buffer)
    }

    fn external(_cells: Rc<RefCell<Vec<Self>>>) -> Option<ExternalView> {
        None
    }

    fn unwrap_external(_view: ExternalView) -> Option<Rc<RefCell<Vec<Self>>>> {
        None
    }

    fn format(&self) -> String {
        if self.is_null() {
            String::from("nullptr")
        } else {
            format!("scope#{}", self.index())
        }
    }

    fn parse(_text: &str) -> Option<Option<Self>> {
        Some(None)
    }
}

impl Element for RttiRef {
    const TYPE: DatumType = DatumType::Pointer;

    fn buffer(values: &Values) -> Option<&Buffer<Self>> {
        match values {
            Values::Pointer(b) => Some(b),
            _ => None,
        }
    }

    fn buffer_mut(values: &mut Values) -> Option<&mut Buffer<Self>> {
        match values {
            Values::Pointer(b) => Some(b),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> Values {
        Values::Pointer(buffer)
    }

    fn external(cells: Rc<RefCell<Vec<Self>>>) -> Option<ExternalView> {
        Some(ExternalView::Pointer(cells))
    }

    fn unwrap_external(view: ExternalView) -> Option<Rc<RefCell<Vec<Self>>>> {
        match view {
            ExternalView::Pointer(c) => Some(c),
            _ => None,
        }
    }

    fn format(&self) -> String {
        match self.get() {
            Some(object) => object.describe(),
            None => String::from("nullptr"),
        }
    }

    fn parse(_text: &str) -> Option<Option<Self>> {
        Some(None)
    }
}

impl Element for DatumRef {
    const TYPE: DatumType = DatumType::Reference;

    fn buffer(values: &Values) -> Option<&Buffer<Self>> {
        match values {
            Values::Reference(b) => Some(b),
            _ => None,
        }
    }

    fn buffer_mut(values: &mut Values) -> Option<&mut Buffer<Self>> {
        match values {
            Values::Reference(b) => Some(b),
            _ => None,
        }
    }

    fn wrap(buffer: Buffer<Self>) -> Values {
        Values::Reference(buffer)
    }

    fn external(cells: Rc<RefCell<Vec<Self>>>) -> Option<ExternalView> {
        Some(ExternalView::Reference(cells))
    }

    fn unwrap_external(view: ExternalView) -> Option<Rc<RefCell<Vec<Self>>>> {
        match view {
            ExternalView::Reference(c) => Some(c),
            _ => None,
        }
    }

    fn format(&self) -> String {
        match self.key() {
            Some(key) => format!("&{}", key),
            None => String::from("nullptr"),
        }
    }

    fn parse(_text: &str) -> Option<Option<Self>> {
        Some(None)
    }
}

impl_datum_element! {
    i32 => Integer,
    f32 => Float,
    Vec4 => Vector,
    Mat4 => Matrix,
    String => String,
    RttiRef => Pointer,
    DatumRef => Reference,
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::from(value.to_string())
    }
}

/// Parse `N` floats out of `vec4(...)`, `mat4x4(...)` or a bare list
fn parse_components<const N: usize>(text: &str) -> Option<[f32; N]> {
    let body = text.trim();
    let body = body
        .strip_prefix("mat4x4")
        .or_else(|| body.strip_prefix("vec4"))
        .unwrap_or(body);

    let mut out = [0.0f32; N];
    let mut count = 0;
    let tokens = body
        .split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ','))
        .filter(|t| !t.is_empty());
    for token in tokens {
        if count == N {
            return None;
        }
        out[count] = token.parse().ok()?;
        count += 1;
    }
    (count == N).then_some(out)
}

/// Runtime-typed array value
pub struct Datum {
    values: Values,
    reserve_strategy: ReserveStrategy,
}

impl Datum {
    /// Create an untyped, empty datum
    pub fn new() -> Self {
        Self {
            values: Values::Unknown,
            reserve_strategy: default_reserve_strategy,
        }
    }

    /// Create an empty datum of the given type
    pub fn with_type(datum_type: DatumType) -> Self {
        let mut datum = Self::new();
        datum.values = Self::empty_values(datum_type);
        datum
    }

    fn from_elements<T: Element>(values: Vec<T>) -> Self {
        let capacity = values.len();
        Self {
            values: T::wrap(Buffer::Owned {
                items: values,
                capacity,
            }),
            reserve_strategy: default_reserve_strategy,
        }
    }

    fn empty_values(datum_type: DatumType) -> Values {
        match datum_type {
            DatumType::Unknown => Values::Unknown,
            DatumType::Integer => Values::Integer(Buffer::new()),
            DatumType::Float => Values::Float(Buffer::new()),
            DatumType::Vector => Values::Vector(Buffer::new()),
            DatumType::Matrix => Values::Matrix(Buffer::new()),
            DatumType::String => Values::String(Buffer::new()),
            DatumType::Table => Values::Table(Buffer::new()),
            DatumType::Pointer => Values::Pointer(Buffer::new()),
            DatumType::Reference => Values::Reference(Buffer::new()),
        }
    }

    /// Current element type
    pub fn datum_type(&self) -> DatumType {
        match &self.values {
            Values::Unknown => DatumType::Unknown,
            Values::Integer(_) => DatumType::Integer,
            Values::Float(_) => DatumType::Float,
            Values::Vector(_) => DatumType::Vector,
            Values::Matrix(_) => DatumType::Matrix,
            Values::String(_) => DatumType::String,
            Values::Table(_) => DatumType::Table,
            Values::Pointer(_) => DatumType::Pointer,
            Values::Reference(_) => DatumType::Reference,
        }
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        with_buffer!(&self.values, b => b.len(), unknown => 0)
    }

    /// True when there are no elements
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Allocated element count (the bound length for external storage)
    pub fn capacity(&self) -> usize {
        with_buffer!(&self.values, b => b.capacity(), unknown => 0)
    }

    /// True when this datum views member storage it does not own
    pub fn is_external(&self) -> bool {
        with_buffer!(&self.values, b => b.is_view(), unknown => false)
    }

    /// Fix the element type of an untyped datum
    pub fn set_type(&mut self, datum_type: DatumType) -> Result<()> {
        if datum_type == DatumType::Unknown {
            return Err(ReflectError::invalid_operation("cannot set a datum's type to unknown"));
        }
        let current = self.datum_type();
        if current != DatumType::Unknown {
            return Err(ReflectError::invalid_operation(format!(
                "datum type is already {}, cannot change it to {}",
                current, datum_type
            )));
        }
        self.values = Self::empty_values(datum_type);
        Ok(())
    }

    /// Replace the growth policy
    pub fn set_reserve_strategy(&mut self, strategy: ReserveStrategy) {
        self.reserve_strategy = strategy;
    }

    /// Ensure room for `capacity` elements
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        let ok = with_buffer!(&mut self.values, b => b.reserve(capacity), unknown => {
            return Err(ReflectError::invalid_operation("cannot reserve storage for an untyped datum"));
        });
        if ok {
            Ok(())
        } else {
            Err(ReflectError::invalid_operation(format!(
                "external storage holds {} elements, cannot reserve {}",
                self.capacity(),
                capacity
            )))
        }
    }

    /// Set the element count, default-filling new owned elements
    pub fn resize(&mut self, size: usize) -> Result<()> {
        self.ensure_not_table("resize")?;
        let ok = with_buffer!(&mut self.values, b => b.resize(size), unknown => {
            return Err(ReflectError::invalid_operation("cannot resize an untyped datum"));
        });
        if ok {
            Ok(())
        } else {
            Err(ReflectError::invalid_operation(format!(
                "external storage holds {} elements, cannot resize to {}",
                self.capacity(),
                size
            )))
        }
    }

    /// Drop unused owned capacity
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        let ok = with_buffer!(&mut self.values, b => b.shrink_to_fit(), unknown => true);
        if ok {
            Ok(())
        } else {
            Err(ReflectError::invalid_operation("cannot reallocate external storage"))
        }
    }

    /// Remove every element. Capacity is kept.
    pub fn clear(&mut self) -> Result<()> {
        self.ensure_not_table("clear")?;
        with_buffer!(&mut self.values, b => b.clear(), unknown => ());
        Ok(())
    }

    /// Read element `index`
    pub fn get<T: DatumElement>(&self, index: usize) -> Result<T> {
        let buffer = self.typed::<T>()?;
        buffer.get(index).ok_or(ReflectError::OutOfRange {
            index,
            size: buffer.len(),
        })
    }

    /// First element
    pub fn front<T: DatumElement>(&self) -> Result<T> {
        self.get(0)
    }

    /// Last element
    pub fn back<T: DatumElement>(&self) -> Result<T> {
        let size = self.typed::<T>()?.len();
        if size == 0 {
            return Err(ReflectError::OutOfRange { index: 0, size });
        }
        self.get(size - 1)
    }

    /// Write element `index`. The first typed write to an untyped datum
    /// fixes its type, even when the index is out of range.
    pub fn set<T: DatumElement>(&mut self, value: T, index: usize) -> Result<()> {
        if matches!(self.values, Values::Unknown) {
            self.values = T::wrap(Buffer::new());
        }
        let buffer = self.typed_mut::<T>()?;
        let size = buffer.len();
        if buffer.set(index, value) {
            Ok(())
        } else {
            Err(ReflectError::OutOfRange { index, size })
        }
    }

    /// Scalar assignment: fixes the type if untyped, then writes element 0
    /// (appending it when the datum is empty)
    pub fn assign<T: DatumElement>(&mut self, value: T) -> Result<()> {
        if self.size() == 0 {
            self.push_back(value)
        } else {
            self.set(value, 0)
        }
    }

    /// Append an element, fixing the type if untyped
    pub fn push_back<T: DatumElement>(&mut self, value: T) -> Result<()> {
        self.push_element(value)
    }

    /// Remove the last element
    pub fn pop_back(&mut self) -> Result<()> {
        self.ensure_not_table("pop from")?;
        let popped = with_buffer!(&mut self.values, b => b.pop().is_some(), unknown => false);
        if popped {
            Ok(())
        } else {
            Err(ReflectError::OutOfRange { index: 0, size: 0 })
        }
    }

    /// Remove element `index`, shifting later elements down
    pub fn remove_at(&mut self, index: usize) -> Result<()> {
        self.ensure_not_table("remove from")?;
        let size = self.size();
        let removed = with_buffer!(&mut self.values, b => b.remove_at(index).is_some(), unknown => false);
        if removed {
            Ok(())
        } else {
            Err(ReflectError::OutOfRange { index, size })
        }
    }

    /// Remove the first element equal to `value`; returns whether one was found
    pub fn remove<T: DatumElement>(&mut self, value: &T) -> Result<bool> {
        match self.find(value)? {
            Some(index) => {
                self.remove_at(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Index of the first element equal to `value`
    pub fn find<T: DatumElement>(&self, value: &T) -> Result<Option<usize>> {
        Ok(self.typed::<T>()?.position(value))
    }

    /// Copy out every element
    pub fn to_vec<T: DatumElement>(&self) -> Result<Vec<T>> {
        Ok(self.typed::<T>()?.to_vec())
    }

    /// Child scopes of a table datum, in order. Empty for other types.
    pub fn scopes(&self) -> Vec<ScopeId> {
        match &self.values {
            Values::Table(b) => b.to_vec(),
            _ => Vec::new(),
        }
    }

    /// Child scope at `index` of a table datum
    pub fn get_scope(&self, index: usize) -> Result<ScopeId> {
        let buffer = self.typed::<ScopeId>()?;
        buffer.get(index).ok_or(ReflectError::OutOfRange {
            index,
            size: buffer.len(),
        })
    }

    /// View `member` as this datum's storage. The datum must be untyped or of
    /// the member's type, and must not already own elements.
    pub fn set_storage<T: DatumElement>(&mut self, member: &Member<T>) -> Result<()> {
        let len = member.len();
        let view = T::external(member.cells())
            .ok_or_else(|| ReflectError::invalid_operation(format!("{} cannot be external", T::TYPE)))?;
        self.bind_external(view, len, len)
    }

    /// Text form of element `index`
    pub fn to_string(&self, index: usize) -> Result<String> {
        fn format_at<T: Element>(buffer: &Buffer<T>, index: usize) -> Result<String> {
            buffer
                .with_slice(|s| s.get(index).map(Element::format))
                .ok_or(ReflectError::OutOfRange {
                    index,
                    size: buffer.len(),
                })
        }

        with_buffer!(&self.values, b => format_at(b, index), unknown => {
            Err(ReflectError::invalid_operation("cannot format an untyped datum"))
        })
    }

    /// Parse `text` into element `index`. Pointer-like types ignore the text.
    pub fn set_from_string(&mut self, text: &str, index: usize) -> Result<()> {
        let datum_type = self.datum_type();

        fn parse_at<T: Element>(
            buffer: &mut Buffer<T>,
            text: &str,
            index: usize,
            datum_type: DatumType,
        ) -> Result<()> {
            if index >= buffer.len() {
                return Err(ReflectError::OutOfRange {
                    index,
                    size: buffer.len(),
                });
            }
            match T::parse(text) {
                Some(Some(value)) => {
                    buffer.set(index, value);
                    Ok(())
                }
                Some(None) => Ok(()),
                None => Err(ReflectError::Parse {
                    datum_type,
                    text: text.to_string(),
                }),
            }
        }

        with_buffer!(&mut self.values, b => parse_at(b, text, index, datum_type), unknown => {
            Err(ReflectError::invalid_operation("cannot parse into an untyped datum"))
        })
    }

    /// Parse `text` and append it. Pointer-like types append a null element.
    pub fn push_from_string(&mut self, text: &str) -> Result<()> {
        let datum_type = self.datum_type();
        let strategy = self.reserve_strategy;

        fn parse_push<T: Element>(
            buffer: &mut Buffer<T>,
            text: &str,
            datum_type: DatumType,
            strategy: ReserveStrategy,
        ) -> Result<()> {
            let value = match T::parse(text) {
                Some(value) => value.unwrap_or_default(),
                None => {
                    return Err(ReflectError::Parse {
                        datum_type,
                        text: text.to_string(),
                    })
                }
            };
            if buffer.push(value, strategy) {
                Ok(())
            } else {
                Err(ReflectError::invalid_operation(format!(
                    "external storage is full ({} elements)",
                    buffer.capacity()
                )))
            }
        }

        if datum_type == DatumType::Table {
            return Err(ReflectError::invalid_operation("cannot parse scopes from text"));
        }
        with_buffer!(&mut self.values, b => parse_push(b, text, datum_type, strategy), unknown => {
            Err(ReflectError::invalid_operation("cannot parse into an untyped datum"))
        })
    }

    fn typed<T: Element>(&self) -> Result<&Buffer<T>> {
        T::buffer(&self.values).ok_or(ReflectError::TypeMismatch {
            expected: self.datum_type(),
            found: T::TYPE,
        })
    }

    fn typed_mut<T: Element>(&mut self) -> Result<&mut Buffer<T>> {
        let current = self.datum_type();
        T::buffer_mut(&mut self.values).ok_or(ReflectError::TypeMismatch {
            expected: current,
            found: T::TYPE,
        })
    }

    fn ensure_not_table(&self, action: &str) -> Result<()> {
        if self.datum_type() == DatumType::Table {
            Err(ReflectError::invalid_operation(format!(
                "cannot {} a table datum directly; use the scope arena",
                action
            )))
        } else {
            Ok(())
        }
    }

    fn push_element<T: Element>(&mut self, value: T) -> Result<()> {
        if matches!(self.values, Values::Unknown) {
            self.values = T::wrap(Buffer::new());
        }
        let strategy = self.reserve_strategy;
        let buffer = self.typed_mut::<T>()?;
        if buffer.push(value, strategy) {
            Ok(())
        } else {
            Err(ReflectError::invalid_operation(format!(
                "external storage is full ({} elements)",
                buffer.capacity()
            )))
        }
    }

    pub(crate) fn push_scope(&mut self, child: ScopeId) -> Result<()> {
        self.push_element(child)
    }

    /// Remove `child` from a table datum; returns whether it was present
    pub(crate) fn remove_scope(&mut self, child: ScopeId) -> bool {
        match &mut self.values {
            Values::Table(b) => match b.position(&child) {
                Some(index) => b.remove_at(index).is_some(),
                None => false,
            },
            _ => false,
        }
    }

    pub(crate) fn clear_scopes(&mut self) {
        if let Values::Table(b) = &mut self.values {
            b.clear();
        }
    }

    /// Same type, strategy and capacity, no elements
    pub(crate) fn empty_like(&self) -> Self {
        let mut copy = Datum::with_type(self.datum_type());
        copy.reserve_strategy = self.reserve_strategy;
        let capacity = self.capacity();
        with_buffer!(&mut copy.values, b => { b.reserve(capacity); }, unknown => ());
        copy
    }

    /// Point this datum at member storage. `size` elements are visible out of
    /// a fixed `capacity`.
    pub(crate) fn bind_external(&mut self, view: ExternalView, size: usize, capacity: usize) -> Result<()> {
        let view_type = view.datum_type();
        let current = self.datum_type();
        if current != DatumType::Unknown && current != view_type {
            return Err(ReflectError::TypeMismatch {
                expected: current,
                found: view_type,
            });
        }
        if !self.is_external() && self.size() > 0 {
            return Err(ReflectError::invalid_operation(
                "datum owns elements; cannot replace them with external storage",
            ));
        }
        if view.len() < capacity || size > capacity {
            return Err(ReflectError::invalid_operation(format!(
                "member holds {} elements, cannot view {} of {}",
                view.len(),
                size,
                capacity
            )));
        }

        fn rebind<T: Element>(view: ExternalView, size: usize, capacity: usize) -> Option<Values> {
            T::unwrap_external(view).map(|cells| T::wrap(Buffer::view(cells, size, capacity)))
        }

        let values = match view_type {
            DatumType::Integer => rebind::<i32>(view, size, capacity),
            DatumType::Float => rebind::<f32>(view, size, capacity),
            DatumType::Vector => rebind::<Vec4>(view, size, capacity),
            DatumType::Matrix => rebind::<Mat4>(view, size, capacity),
            DatumType::String => rebind::<String>(view, size, capacity),
            DatumType::Pointer => rebind::<RttiRef>(view, size, capacity),
            DatumType::Reference => rebind::<DatumRef>(view, size, capacity),
            DatumType::Unknown | DatumType::Table => None,
        };
        self.values = values.ok_or_else(|| {
            ReflectError::invalid_operation(format!("{} cannot be external", view_type))
        })?;
        Ok(())
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Datum {
    /// Owned storage is deep-copied; external storage stays a view of the
    /// same member.
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            reserve_strategy: self.reserve_strategy,
        }
    }
}

impl PartialEq for Datum {
    /// Type-, size- and element-wise equality. Table and reference elements
    /// compare by identity here; `ScopeArena::datums_equal` compares them
    /// structurally.
    fn eq(&self, other: &Self) -> bool {
        if self.datum_type() != other.datum_type() || self.size() != other.size() {
            return false;
        }
        match (&self.values, &other.values) {
            (Values::Unknown, Values::Unknown) => true,
            (Values::Integer(a), Values::Integer(b)) => a.elements_eq(b),
            (Values::Float(a), Values::Float(b)) => a.elements_eq(b),
            (Values::Vector(a), Values::Vector(b)) => a.elements_eq(b),
            (Values::Matrix(a), Values::Matrix(b)) => a.elements_eq(b),
            (Values::String(a), Values::String(b)) => a.elements_eq(b),
            (Values::Table(a), Values::Table(b)) => a.elements_eq(b),
            (Values::Pointer(a), Values::Pointer(b)) => a.elements_eq(b),
            (Values::Reference(a), Values::Reference(b)) => a.elements_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Datum");
        s.field("type", &self.datum_type())
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .field("external", &self.is_external());
        let elements: Vec<String> = (0..self.size().min(8))
            .filter_map(|i| Datum::to_string(self, i).ok())
            .collect();
        s.field("elements", &elements).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_unknown() {
        let datum = Datum::new();
        assert_eq!(datum.datum_type(), DatumType::Unknown);
        assert_eq!(datum.size(), 0);
        assert_eq!(datum.capacity(), 0);
        assert!(!datum.is_external());
    }

    #[test]
    fn test_set_type_only_once() {
        let mut datum = Datum::new();
        datum.set_type(DatumType::Integer).unwrap();
        assert_eq!(datum.datum_type(), DatumType::Integer);

        let err = datum.set_type(DatumType::Float).unwrap_err();
        assert!(matches!(err, ReflectError::InvalidOperation(_)));
        let err = datum.set_type(DatumType::Integer).unwrap_err();
        assert!(matches!(err, ReflectError::InvalidOperation(_)));
        assert_eq!(datum.datum_type(), DatumType::Integer);
    }

    #[test]
    fn test_push_back_fixes_type() {
        let mut datum = Datum::new();
        datum.push_back(1.5f32).unwrap();
        assert_eq!(datum.datum_type(), DatumType::Float);

        let err = datum.push_back(1i32).unwrap_err();
        assert_eq!(
            err,
            ReflectError::TypeMismatch {
                expected: DatumType::Float,
                found: DatumType::Integer
            }
        );
        assert_eq!(datum.size(), 1);
    }

    #[test]
    fn test_get_set_bounds_and_types() {
        let mut datum = Datum::from(vec![10, 20, 30]);
        assert_eq!(datum.get::<i32>(1).unwrap(), 20);

        datum.set(25, 1).unwrap();
        assert_eq!(datum.get::<i32>(1).unwrap(), 25);

        assert_eq!(
            datum.get::<i32>(3).unwrap_err(),
            ReflectError::OutOfRange { index: 3, size: 3 }
        );
        assert!(matches!(
            datum.get::<f32>(0).unwrap_err(),
            ReflectError::TypeMismatch { .. }
        ));
        assert!(matches!(
            datum.set(String::from("x"), 0).unwrap_err(),
            ReflectError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_set_on_untyped_fixes_type() {
        let mut datum = Datum::new();
        assert_eq!(
            datum.set(5i32, 0).unwrap_err(),
            ReflectError::OutOfRange { index: 0, size: 0 }
        );
        assert_eq!(datum.datum_type(), DatumType::Integer);
        assert!(matches!(
            datum.set(1.5f32, 0).unwrap_err(),
            ReflectError::TypeMismatch { .. }
        ));

        datum.assign(5i32).unwrap();
        assert_eq!(datum.datum_type(), DatumType::Integer);
        datum.assign(6i32).unwrap();
        assert_eq!(datum.size(), 1);
        assert_eq!(datum.front::<i32>().unwrap(), 6);
    }

    #[test]
    fn test_reserve_and_resize() {
        let mut untyped = Datum::new();
        assert!(matches!(untyped.reserve(4), Err(ReflectError::InvalidOperation(_))));
        assert!(matches!(untyped.resize(4), Err(ReflectError::InvalidOperation(_))));

        let mut datum = Datum::with_type(DatumType::String);
        datum.reserve(8).unwrap();
        assert_eq!(datum.capacity(), 8);
        assert_eq!(datum.size(), 0);

        datum.resize(3).unwrap();
        assert_eq!(datum.size(), 3);
        assert_eq!(datum.get::<String>(2).unwrap(), "");

        datum.resize(1).unwrap();
        assert_eq!(datum.size(), 1);
        datum.shrink_to_fit().unwrap();
        assert_eq!(datum.capacity(), 1);
    }

    #[test]
    fn test_reserve_strategy_is_used() {
        fn plus_ten(size: usize, capacity: usize) -> usize {
            size.max(capacity + 10)
        }

        let mut datum = Datum::with_type(DatumType::Integer);
        datum.set_reserve_strategy(plus_ten);
        datum.push_back(1).unwrap();
        assert_eq!(datum.capacity(), 10);
        for i in 0..10 {
            datum.push_back(i).unwrap();
        }
        assert_eq!(datum.capacity(), 20);
    }

    #[test]
    fn test_pop_remove_find() {
        let mut datum = Datum::from(vec![1, 2, 3, 2]);
        assert_eq!(datum.find(&2).unwrap(), Some(1));
        assert!(datum.remove(&2).unwrap());
        assert_eq!(datum.to_vec::<i32>().unwrap(), vec![1, 3, 2]);
        assert!(!datum.remove(&9).unwrap());

        datum.remove_at(0).unwrap();
        datum.pop_back().unwrap();
        assert_eq!(datum.to_vec::<i32>().unwrap(), vec![3]);
        assert_eq!(datum.back::<i32>().unwrap(), 3);

        datum.pop_back().unwrap();
        assert!(matches!(datum.pop_back(), Err(ReflectError::OutOfRange { .. })));
        assert!(matches!(datum.remove_at(0), Err(ReflectError::OutOfRange { .. })));
    }

    #[test]
    fn test_external_storage_is_a_view() {
        let member = Member::new(vec![1, 2]);
        let mut datum = Datum::new();
        datum.set_storage(&member).unwrap();

        assert!(datum.is_external());
        assert_eq!(datum.size(), 2);
        assert_eq!(datum.capacity(), 2);

        datum.set(10, 0).unwrap();
        assert_eq!(member.get(0), Some(10));

        member.set(1, 20);
        assert_eq!(datum.get::<i32>(1).unwrap(), 20);
    }

    #[test]
    fn test_external_storage_cannot_grow() {
        let member = Member::new(vec![1, 2]);
        let mut datum = Datum::with_type(DatumType::Integer);
        datum.set_storage(&member).unwrap();

        let err = datum.push_back(3).unwrap_err();
        assert!(matches!(err, ReflectError::InvalidOperation(_)));
        assert_eq!(datum.size(), 2);
        assert_eq!(datum.to_vec::<i32>().unwrap(), vec![1, 2]);

        assert!(matches!(datum.reserve(3), Err(ReflectError::InvalidOperation(_))));
        assert!(matches!(datum.resize(3), Err(ReflectError::InvalidOperation(_))));
        assert!(matches!(datum.shrink_to_fit(), Err(ReflectError::InvalidOperation(_))));
        datum.reserve(2).unwrap();
    }

    #[test]
    fn test_external_storage_shrinks_and_regrows_within_capacity() {
        let member = Member::new(vec![1, 2, 3]);
        let mut datum = Datum::new();
        datum.set_storage(&member).unwrap();

        datum.remove_at(0).unwrap();
        assert_eq!(datum.to_vec::<i32>().unwrap(), vec![2, 3]);
        datum.push_back(4).unwrap();
        assert_eq!(member.to_vec(), vec![2, 3, 4]);
        assert!(datum.push_back(5).is_err());
    }

    #[test]
    fn test_set_storage_rejects_owned_or_mismatched() {
        let member = Member::new(vec![1.0f32]);

        let mut owned = Datum::from(vec![1.0f32]);
        assert!(matches!(owned.set_storage(&member), Err(ReflectError::InvalidOperation(_))));

        let mut ints = Datum::with_type(DatumType::Integer);
        assert!(matches!(ints.set_storage(&member), Err(ReflectError::TypeMismatch { .. })));
    }

    #[test]
    fn test_equality() {
        let a = Datum::from(vec![1, 2, 3]);
        let b = Datum::from(vec![1, 2, 3]);
        let c = Datum::from(vec![1, 2]);
        let d = Datum::from(vec![1.0f32, 2.0, 3.0]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(Datum::new(), Datum::new());

        let member = Member::new(vec![1, 2, 3]);
        let mut view = Datum::new();
        view.set_storage(&member).unwrap();
        assert_eq!(a, view);
    }

    #[test]
    fn test_clone_deep_copies_owned_and_aliases_views() {
        let original = Datum::from(vec![String::from("a"), String::from("b")]);
        let mut copy = original.clone();
        copy.set(String::from("z"), 0).unwrap();
        assert_eq!(original.get::<String>(0).unwrap(), "a");

        let member = Member::new(vec![1]);
        let mut view = Datum::new();
        view.set_storage(&member).unwrap();
        let mut alias = view.clone();
        alias.set(7, 0).unwrap();
        assert_eq!(view.get::<i32>(0).unwrap(), 7);
    }

    #[test]
    fn test_string_round_trips() {
        let mut ints = Datum::from(vec![-42, 0, i32::MAX]);
        for i in 0..ints.size() {
            let text = ints.to_string(i).unwrap();
            let before = ints.get::<i32>(i).unwrap();
            ints.set_from_string(&text, i).unwrap();
            assert_eq!(ints.get::<i32>(i).unwrap(), before);
        }

        let mut floats = Datum::from(vec![0.1f32, -3.25, 1.0e-7]);
        for i in 0..floats.size() {
            let text = floats.to_string(i).unwrap();
            let before = floats.get::<f32>(i).unwrap();
            floats.set(0.0f32, i).unwrap();
            floats.set_from_string(&text, i).unwrap();
            assert_eq!(floats.get::<f32>(i).unwrap(), before);
        }

        let mut strings = Datum::from(vec![String::from("hello world"), String::new()]);
        let text = strings.to_string(0).unwrap();
        strings.set_from_string(&text, 1).unwrap();
        assert_eq!(strings.get::<String>(1).unwrap(), "hello world");
    }

    #[test]
    fn test_vector_and_matrix_text() {
        let v = Vec4::new(1.5, -2.0, 0.25, 4.0);
        let mut datum = Datum::from(v);
        let text = datum.to_string(0).unwrap();
        assert_eq!(text, "vec4(1.5, -2, 0.25, 4)");
        datum.set(Vec4::ZERO, 0).unwrap();
        datum.set_from_string(&text, 0).unwrap();
        assert!(datum.get::<Vec4>(0).unwrap().abs_diff_eq(v, 1e-6));

        let m = Mat4::from_cols_array(&[
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        ]);
        let mut datum = Datum::from(m);
        let text = datum.to_string(0).unwrap();
        assert!(text.starts_with("mat4x4((1, 2, 3, 4), (5, 6, 7, 8)"));
        datum.set(Mat4::IDENTITY, 0).unwrap();
        datum.set_from_string(&text, 0).unwrap();
        assert!(datum.get::<Mat4>(0).unwrap().abs_diff_eq(m, 1e-6));

        datum.set_from_string("[1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1]", 0).unwrap();
        assert_eq!(datum.get::<Mat4>(0).unwrap(), Mat4::IDENTITY);
    }

    #[test]
    fn test_parse_failure_leaves_value() {
        let mut datum = Datum::from(5);
        let err = datum.set_from_string("five", 0).unwrap_err();
        assert!(matches!(err, ReflectError::Parse { .. }));
        assert_eq!(datum.get::<i32>(0).unwrap(), 5);

        let mut vector = Datum::from(Vec4::ONE);
        assert!(vector.set_from_string("vec4(1, 2, 3)", 0).is_err());
        assert_eq!(vector.get::<Vec4>(0).unwrap(), Vec4::ONE);
    }

    #[test]
    fn test_pointer_text_conversion() {
        let mut datum = Datum::from(RttiRef::null());
        assert_eq!(datum.to_string(0).unwrap(), "nullptr");
        datum.set_from_string("anything", 0).unwrap();
        assert!(datum.get::<RttiRef>(0).unwrap().is_null());
        assert!(datum.set_from_string("anything", 1).is_err());

        let reference = Datum::from(DatumRef::null());
        assert_eq!(reference.to_string(0).unwrap(), "nullptr");
    }

    #[test]
    fn test_table_datums_reject_direct_mutation() {
        let mut table = Datum::with_type(DatumType::Table);
        assert!(matches!(table.resize(2), Err(ReflectError::InvalidOperation(_))));
        assert!(matches!(table.clear(), Err(ReflectError::InvalidOperation(_))));
        assert!(matches!(table.pop_back(), Err(ReflectError::InvalidOperation(_))));
        table.reserve(4).unwrap();
        assert_eq!(table.capacity(), 4);
        assert!(table.scopes().is_empty());
    }

    #[test]
    fn test_datum_type_names() {
        for t in DatumType::ALL {
            assert_eq!(t.name().parse::<DatumType>().unwrap(), t);
        }
        assert_eq!("Integer".parse::<DatumType>().unwrap(), DatumType::Integer);
        assert!("bogus".parse::<DatumType>().is_err());
        assert!(!DatumType::Table.supports_external());
    }
}
