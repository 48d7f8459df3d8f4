//! RFC 6902 JSON Patch differ over `serde_json::Value`.
//!
//! `diff_both` produces the forward (before -> after) and backward
//! (after -> before) op sequences in a single recursive traversal, so the
//! driver never has to diff twice to get an invertible patch pair.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single RFC 6902 patch operation.
///
/// `value` is omitted from the JSON encoding for `remove` operations, where
/// it has no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchOpKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOpKind {
    Add,
    Remove,
    Replace,
}

impl PatchOp {
    fn add(path: String, value: Value) -> Self {
        Self {
            op: PatchOpKind::Add,
            path,
            value: Some(value),
        }
    }

    fn remove(path: String) -> Self {
        Self {
            op: PatchOpKind::Remove,
            path,
            value: None,
        }
    }

    fn replace(path: String, value: Value) -> Self {
        Self {
            op: PatchOpKind::Replace,
            path,
            value: Some(value),
        }
    }
}

/// Diff two JSON trees of aligned shape, returning `(forward, backward)` op
/// sequences rooted at `path` (use `""` for the document root).
///
/// `a` is the "before" tree, `b` is the "after" tree. Applying `forward` to
/// `a` yields `b`; applying `backward` to `b` yields `a`.
pub fn diff_both(a: &Value, b: &Value) -> (Vec<PatchOp>, Vec<PatchOp>) {
    let mut fwd = Vec::new();
    let mut bwd = Vec::new();
    diff_into(a, b, "", &mut fwd, &mut bwd);
    (fwd, bwd)
}

fn diff_into(a: &Value, b: &Value, path: &str, fwd: &mut Vec<PatchOp>, bwd: &mut Vec<PatchOp>) {
    match (a, b) {
        (Value::Null, Value::Null) => {}
        (Value::Null, _) => {
            fwd.push(PatchOp::replace(path.to_string(), b.clone()));
            bwd.push(PatchOp::replace(path.to_string(), a.clone()));
        }
        (_, Value::Null) => {
            fwd.push(PatchOp::replace(path.to_string(), b.clone()));
            bwd.push(PatchOp::replace(path.to_string(), a.clone()));
        }
        (Value::Object(am), Value::Object(bm)) => {
            for (k, av) in am {
                if !bm.contains_key(k) {
                    let child = format!("{path}/{}", escape_key(k));
                    fwd.push(PatchOp::remove(child.clone()));
                    bwd.push(PatchOp::add(child, av.clone()));
                }
            }
            for (k, bv) in bm {
                let child = format!("{path}/{}", escape_key(k));
                match am.get(k) {
                    None => {
                        fwd.push(PatchOp::add(child.clone(), bv.clone()));
                        bwd.push(PatchOp::remove(child));
                    }
                    Some(av) => diff_into(av, bv, &child, fwd, bwd),
                }
            }
        }
        (Value::Array(aa), Value::Array(ba)) => {
            let min_len = aa.len().min(ba.len());
            for i in 0..min_len {
                let child = format!("{path}/{i}");
                diff_into(&aa[i], &ba[i], &child, fwd, bwd);
            }
            // Trailing extras in `a`: forward removes descending, backward adds ascending.
            for i in (min_len..aa.len()).rev() {
                let child = format!("{path}/{i}");
                fwd.push(PatchOp::remove(child.clone()));
                bwd.push(PatchOp::add(child, aa[i].clone()));
            }
            // Trailing extras in `b`: forward adds ascending, backward removes descending.
            for i in min_len..ba.len() {
                let child = format!("{path}/{i}");
                fwd.push(PatchOp::add(child.clone(), ba[i].clone()));
            }
            for i in (min_len..ba.len()).rev() {
                let child = format!("{path}/{i}");
                bwd.push(PatchOp::remove(child));
            }
        }
        _ => {
            if a != b {
                fwd.push(PatchOp::replace(path.to_string(), b.clone()));
                bwd.push(PatchOp::replace(path.to_string(), a.clone()));
            }
        }
    }
}

/// Escape a JSON object key as an RFC 6901 pointer token (`~` -> `~0`, `/` -> `~1`).
fn escape_key(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
