//! Structural checks over a whole section.

use ps_core::geometry::ensure_finite;
use ps_core::{InvId, UniId};
use tracing::warn;

use crate::error::{TopologyError, TopologyResult};
use crate::section::Section;

/// Check the stored invariants: finite coordinates, zero-mode
/// cardinalities, endpoint references and uniqueness under polymorph-aware
/// identity.
pub fn validate_section(section: &Section) -> TopologyResult<()> {
    let table = section.polymorphs();

    for (id, inv) in section.invpoints() {
        ensure_finite(&[inv.point()], &format!("invariant point {id}"))?;
    }
    for (id, uni) in section.unilines() {
        ensure_finite(uni.raw(), &format!("univariant line {id}"))?;
    }
    for (id, dgm) in section.dogmins() {
        ensure_finite(&[dgm.point()], &format!("dogmin {id}"))?;
    }

    for (_, inv) in section.invpoints() {
        if inv.out.len() != 2 {
            return Err(TopologyError::BadOutCount {
                kind: "Invariant point",
                expected: 2,
                got: inv.out.len(),
            });
        }
    }

    for (id, uni) in section.unilines() {
        if uni.out.len() != 1 {
            return Err(TopologyError::BadOutCount {
                kind: "Univariant line",
                expected: 1,
                got: uni.out.len(),
            });
        }
        for inv in [uni.begin, uni.end].into_iter().flatten() {
            if section.invpoint(inv).is_none() {
                return Err(TopologyError::DanglingEndpoint { uni: id, inv });
            }
        }
    }

    let invs: Vec<_> = section.invpoints().collect();
    for (i, (a_id, a)) in invs.iter().enumerate() {
        for (b_id, b) in &invs[i + 1..] {
            if table.equivalent_out(&a.phases, &a.out, &b.phases, &b.out) {
                return Err(TopologyError::Duplicate {
                    kind: "Invariant points",
                    first: a_id.get(),
                    second: b_id.get(),
                });
            }
        }
    }

    let unis: Vec<_> = section.unilines().collect();
    for (i, (a_id, a)) in unis.iter().enumerate() {
        for (b_id, b) in &unis[i + 1..] {
            if table.equivalent_out(&a.phases, &a.out, &b.phases, &b.out) {
                return Err(TopologyError::Duplicate {
                    kind: "Univariant lines",
                    first: a_id.get(),
                    second: b_id.get(),
                });
            }
        }
    }
    Ok(())
}

/// Bound endpoints the line cannot actually terminate at.
pub fn inconsistent_connections(section: &Section) -> Vec<(UniId, InvId)> {
    let mut bad = Vec::new();
    for (id, uni) in section.unilines() {
        for inv_id in [uni.begin, uni.end].into_iter().flatten() {
            let Some(inv) = section.invpoint(inv_id) else {
                continue;
            };
            if !uni.contains_inv(inv, section.polymorphs()) {
                warn!(uni = %id, inv = %inv_id, "line is bound to a point it cannot end at");
                bad.push((id, inv_id));
            }
        }
    }
    bad
}
