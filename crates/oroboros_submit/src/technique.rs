//! # Technique Dispatch Table
//!
//! Techniques turn a run of tasks into rendering work. The table is built
//! once at startup, indexed by technique ordinal, and read-only afterwards.
//!
//! Ordinal `0` handles pass-begin markers and the highest ordinal handles
//! pass-end markers, so every table has at least two entries.

use crate::error::{ConfigError, ConfigResult};
use crate::task_list::TaskRecord;

/// An enum usable as a pass or technique ordinal.
///
/// ```rust,ignore
/// #[derive(Clone, Copy)]
/// enum Technique { PassBegin, Opaque, Transparent, PassEnd }
///
/// impl Ordinal for Technique {
///     const COUNT: u8 = 4;
///     fn ordinal(self) -> u8 { self as u8 }
/// }
/// ```
pub trait Ordinal: Copy {
    /// Number of ordinals. Valid values are `0..COUNT`.
    const COUNT: u8;

    /// This value's ordinal.
    fn ordinal(self) -> u8;
}

/// A contiguous run of tasks sharing one `(pass, technique)` pair.
///
/// The run borrows frame memory: neither the slice nor any payload may be
/// kept after the handler returns.
#[derive(Clone, Copy, Debug)]
pub struct TaskRun<'a> {
    pass: u8,
    technique: u8,
    tasks: &'a [TaskRecord],
}

impl<'a> TaskRun<'a> {
    pub(crate) const fn new(pass: u8, technique: u8, tasks: &'a [TaskRecord]) -> Self {
        Self { pass, technique, tasks }
    }

    /// Pass ordinal.
    #[inline]
    #[must_use]
    pub const fn pass(&self) -> u8 {
        self.pass
    }

    /// Technique ordinal.
    #[inline]
    #[must_use]
    pub const fn technique(&self) -> u8 {
        self.technique
    }

    /// The tasks, sorted by priority, equal priorities in submission order.
    #[inline]
    #[must_use]
    pub const fn tasks(&self) -> &'a [TaskRecord] {
        self.tasks
    }

    /// Number of tasks in the run.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true for an empty run. The dispatcher never produces one.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates the tasks in dispatch order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'a, TaskRecord> {
        self.tasks.iter()
    }

    /// Iterates the payload bytes of tasks that carry one.
    pub fn payloads(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.tasks.iter().filter_map(TaskRecord::payload)
    }
}

impl<'a> IntoIterator for TaskRun<'a> {
    type Item = &'a TaskRecord;
    type IntoIter = std::slice::Iter<'a, TaskRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

/// A technique handler.
///
/// `shared` is the frame's externally owned rendering context (target
/// view, camera state, command recorder). Handlers communicate purely by
/// side effects on it.
pub trait Technique<C>: Send + Sync {
    /// Executes one run.
    fn execute(&self, run: TaskRun<'_>, shared: &mut C);
}

/// Adapts a closure to [`Technique`].
struct FnTechnique<F>(F);

impl<C, F> Technique<C> for FnTechnique<F>
where
    F: Fn(TaskRun<'_>, &mut C) + Send + Sync,
{
    #[inline]
    fn execute(&self, run: TaskRun<'_>, shared: &mut C) {
        (self.0)(run, shared);
    }
}

/// Ordinal-indexed table of technique handlers.
pub struct TechniqueTable<C> {
    handlers: Box<[Box<dyn Technique<C>>]>,
}

impl<C> TechniqueTable<C> {
    /// Starts a table with `count` slots.
    #[must_use]
    pub fn builder(count: u8) -> TechniqueTableBuilder<C> {
        TechniqueTableBuilder {
            slots: (0..count).map(|_| None).collect(),
        }
    }

    /// Starts a table sized for the ordinal enum `T`.
    #[must_use]
    pub fn builder_for<T: Ordinal>() -> TechniqueTableBuilder<C> {
        Self::builder(T::COUNT)
    }

    /// Number of techniques.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn len(&self) -> u8 {
        // The builder never holds more than u8::MAX slots.
        self.handlers.len() as u8
    }

    /// Always false; a built table has at least two techniques.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Ordinal of the pass-end technique.
    #[inline]
    #[must_use]
    pub fn last(&self) -> u8 {
        self.len() - 1
    }

    /// Looks up the handler for `technique`.
    #[inline]
    #[must_use]
    pub fn get(&self, technique: u8) -> Option<&dyn Technique<C>> {
        let handler = self.handlers.get(usize::from(technique))?;
        Some(&**handler)
    }
}

impl<C> std::fmt::Debug for TechniqueTable<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TechniqueTable")
            .field("len", &self.handlers.len())
            .finish()
    }
}

/// Builder for [`TechniqueTable`].
pub struct TechniqueTableBuilder<C> {
    slots: Vec<Option<Box<dyn Technique<C>>>>,
}

impl<C> TechniqueTableBuilder<C> {
    /// Registers a closure handler.
    ///
    /// # Errors
    ///
    /// [`ConfigError::TechniqueOutOfRange`] if `technique` has no slot,
    /// [`ConfigError::DuplicateTechnique`] if it is already registered.
    pub fn register<F>(self, technique: u8, handler: F) -> ConfigResult<Self>
    where
        F: Fn(TaskRun<'_>, &mut C) + Send + Sync + 'static,
    {
        self.register_technique(technique, FnTechnique(handler))
    }

    /// Registers a closure handler by ordinal enum.
    ///
    /// # Errors
    ///
    /// As [`TechniqueTableBuilder::register`].
    pub fn register_ordinal<T, F>(self, technique: T, handler: F) -> ConfigResult<Self>
    where
        T: Ordinal,
        F: Fn(TaskRun<'_>, &mut C) + Send + Sync + 'static,
    {
        self.register(technique.ordinal(), handler)
    }

    /// Registers a [`Technique`] implementation.
    ///
    /// # Errors
    ///
    /// As [`TechniqueTableBuilder::register`].
    pub fn register_technique<T>(mut self, technique: u8, handler: T) -> ConfigResult<Self>
    where
        T: Technique<C> + 'static,
    {
        #[allow(clippy::cast_possible_truncation)]
        let count = self.slots.len() as u8;
        let slot = self
            .slots
            .get_mut(usize::from(technique))
            .ok_or(ConfigError::TechniqueOutOfRange { technique, count })?;
        if slot.is_some() {
            return Err(ConfigError::DuplicateTechnique(technique));
        }
        *slot = Some(Box::new(handler));
        Ok(self)
    }

    /// Finishes the table.
    ///
    /// # Errors
    ///
    /// [`ConfigError::TooFewTechniques`] for fewer than two slots,
    /// [`ConfigError::MissingTechnique`] for the first unfilled slot.
    pub fn build(self) -> ConfigResult<TechniqueTable<C>> {
        #[allow(clippy::cast_possible_truncation)]
        let count = self.slots.len() as u8;
        if count < 2 {
            return Err(ConfigError::TooFewTechniques(count));
        }
        let handlers = self
            .slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(ConfigError::MissingTechnique(index as u8)))
            .collect::<ConfigResult<Vec<_>>>()?;
        Ok(TechniqueTable {
            handlers: handlers.into_boxed_slice(),
        })
    }
}
