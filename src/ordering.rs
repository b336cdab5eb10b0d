//! Output ordering and cache grouping for collections of script references.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::script::ScriptReference;

/// Primary output comparator: higher precedence (lower rank) first.
pub fn by_priority(a: &ScriptReference, b: &ScriptReference) -> Ordering {
  a.priority().cmp(&b.priority())
}

/// Sort references for output. Equal priorities keep their registration order.
pub fn sort_for_output(scripts: &mut [ScriptReference]) {
  scripts.sort_by(by_priority);
}

/// Group references by cache partition.
///
/// Partitions are keyed by name; within a partition, references are in output order.
pub fn group_by_cache_partition<'a, I>(scripts: I) -> BTreeMap<String, Vec<&'a ScriptReference>>
where
  I: IntoIterator<Item = &'a ScriptReference>,
{
  let mut groups: BTreeMap<String, Vec<&'a ScriptReference>> = BTreeMap::new();
  for script in scripts {
    groups
      .entry(script.cache_partition().to_string())
      .or_default()
      .push(script);
  }

  for members in groups.values_mut() {
    members.sort_by(|a, b| by_priority(a, b));
  }

  groups
}
