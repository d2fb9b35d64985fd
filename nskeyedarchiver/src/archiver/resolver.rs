/*!
 Walks the `$objects` table of a validated envelope, turning back-references into [`Value`]s.

 Each slot in the table is resolved at most once. The state of every slot is tracked so that
 repeated back-references return the same [`Value`] identity and cycles terminate: collections and
 objects register their (still empty) handle before their children are resolved, so a child that
 refers back to its owner receives that handle.
*/

use plist::Value as PlistValue;

use crate::{
    archiver::{
        classes::ClassDescriptor,
        envelope::ValidatedEnvelope,
        models::Value,
        reconstructor::{primitive, reconstruct},
    },
    error::decode::DecodeError,
    util::{options::ArchiverOptions, plist::as_uid},
};

/// The progress of a single slot in the `$objects` table
#[derive(Debug, Clone)]
enum Resolution {
    Unvisited,
    /// Being reconstructed; holds the handle to return if the slot is reached again
    InProgress(Option<Value>),
    Done(Value),
}

/// Resolves the named roots of an envelope, in the order they appear in `$top`
pub fn resolve(
    envelope: &ValidatedEnvelope<'_>,
    options: &ArchiverOptions,
) -> Result<Vec<Value>, DecodeError> {
    let mut resolver = Resolver::new(envelope.objects(), options.max_depth);
    let roots = envelope
        .top()
        .iter()
        .map(|(name, reference)| {
            let idx = as_uid(reference).ok_or_else(|| DecodeError::malformed("$top", name))?;
            resolver.resolve_index(idx)
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        objects = envelope.objects().len(),
        roots = roots.len(),
        "Resolved keyed archive"
    );
    Ok(roots)
}

/// Contains the object table and the resolution state of every slot in it
#[derive(Debug)]
pub struct Resolver<'a> {
    /// The `$objects` table being resolved
    objects: &'a [PlistValue],
    /// Parallel to `objects`
    states: Vec<Resolution>,
    /// How many nested entries are currently being resolved
    depth: usize,
    max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(objects: &'a [PlistValue], max_depth: usize) -> Self {
        Self {
            objects,
            states: vec![Resolution::Unvisited; objects.len()],
            depth: 0,
            max_depth,
        }
    }

    /// Dereference a back-reference into the object table
    ///
    /// Slot `0` is the null marker and is always [`Value::Null`].
    pub fn resolve_index(&mut self, idx: u64) -> Result<Value, DecodeError> {
        let slot = self.slot(idx)?;
        if slot == 0 {
            return Ok(Value::Null);
        }

        match &self.states[slot] {
            Resolution::Done(value) | Resolution::InProgress(Some(value)) => {
                return Ok(value.clone())
            }
            // A cycle through an entry that cannot hand out a handle early
            Resolution::InProgress(None) => return Err(DecodeError::BrokenReference(idx)),
            Resolution::Unvisited => {}
        }

        let objects = self.objects;
        // Class descriptors are only reachable through `$class`
        if ClassDescriptor::from_entry(&objects[slot]).is_some() {
            return Err(DecodeError::BrokenReference(idx));
        }
        // Raw scalars are leaves and do not count toward the depth limit
        let entry = &objects[slot];
        let nested = matches!(entry, PlistValue::Dictionary(_) | PlistValue::Uid(_));
        if nested {
            self.enter()?;
        }
        self.states[slot] = Resolution::InProgress(None);
        let result = reconstruct(entry, Some(slot), self);
        if nested {
            self.leave();
        }

        let value = result?;
        self.states[slot] = Resolution::Done(value.clone());
        Ok(value)
    }

    /// Resolve a field value that may be a back-reference or stored inline
    pub fn resolve_field(
        &mut self,
        field: &PlistValue,
        class_name: &str,
        key: &str,
    ) -> Result<Value, DecodeError> {
        if let Some(idx) = as_uid(field) {
            return self.resolve_index(idx);
        }
        if let Some(value) = primitive(field, class_name, key)? {
            return Ok(value);
        }
        match field {
            PlistValue::Array(items) => {
                self.enter()?;
                let resolved = items
                    .iter()
                    .map(|item| self.resolve_field(item, class_name, key))
                    .collect::<Result<Vec<_>, _>>();
                self.leave();
                Ok(Value::array(resolved?))
            }
            PlistValue::Dictionary(_) => {
                self.enter()?;
                let resolved = reconstruct(field, None, self);
                self.leave();
                resolved
            }
            _ => Err(DecodeError::malformed(class_name, key)),
        }
    }

    /// Resolve a field that must be an array of back-references
    pub fn resolve_references(
        &mut self,
        field: Option<&PlistValue>,
        class_name: &str,
        key: &str,
    ) -> Result<Vec<Value>, DecodeError> {
        field
            .and_then(PlistValue::as_array)
            .ok_or_else(|| DecodeError::malformed(class_name, key))?
            .iter()
            .map(|item| {
                let idx = as_uid(item).ok_or_else(|| DecodeError::malformed(class_name, key))?;
                self.resolve_index(idx)
            })
            .collect()
    }

    /// Read the class descriptor a `$class` back-reference points at
    ///
    /// Descriptors are read straight from the table and never become [`Value`]s.
    pub fn descriptor(&self, idx: u64) -> Result<ClassDescriptor, DecodeError> {
        let slot = self.slot(idx)?;
        ClassDescriptor::from_entry(&self.objects[slot]).ok_or(DecodeError::BrokenReference(idx))
    }

    /// Store the handle a cyclic back-reference to `slot` should receive
    pub(crate) fn register(&mut self, slot: Option<usize>, placeholder: &Value) {
        if let Some(slot) = slot {
            self.states[slot] = Resolution::InProgress(Some(placeholder.clone()));
        }
    }

    fn slot(&self, idx: u64) -> Result<usize, DecodeError> {
        usize::try_from(idx)
            .ok()
            .filter(|slot| *slot < self.objects.len())
            .ok_or(DecodeError::BrokenReference(idx))
    }

    fn enter(&mut self) -> Result<(), DecodeError> {
        if self.depth >= self.max_depth {
            return Err(DecodeError::GraphTooDeep(self.max_depth));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }
}
