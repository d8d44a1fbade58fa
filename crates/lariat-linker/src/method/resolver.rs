//! Overload resolution
//!
//! Applicability filtering, specificity ranking, varargs packing, and the
//! residual dispatcher that repeats the runtime half of this work on
//! every invocation when link time could not commit to a single target.

use super::CandidateMethod;
use crate::call_site::CallSiteDescriptor;
use crate::services::LinkerServices;
use lariat_core::handle::{InvocableHandle, MethodSignature};
use lariat_core::types::{StaticType, TypeKey};
use lariat_core::{LinkError, LinkResult, Value};
use std::sync::Arc;

/// Arity applicability: exact for fixed-arity signatures, at-least-fixed
/// for varargs
pub(super) fn matches_arity(sig: &MethodSignature, arg_count: usize) -> bool {
    if sig.is_varargs() {
        arg_count >= sig.fixed_arity()
    } else {
        arg_count == sig.param_types().len()
    }
}

/// Declared parameter type governing argument position `index`; trailing
/// positions of a varargs signature are governed by the element type
fn param_type_at(sig: &MethodSignature, index: usize) -> &TypeKey {
    let params = sig.param_types();
    if sig.is_varargs() && index + 1 >= params.len() {
        &params[params.len() - 1]
    } else {
        &params[index]
    }
}

/// Convertibility of one argument position, including the case where a
/// single trailing argument is already the packed varargs array
fn convertible_at(
    sig: &MethodSignature,
    index: usize,
    arg_count: usize,
    from: &TypeKey,
    services: &dyn LinkerServices,
) -> bool {
    let to = param_type_at(sig, index);
    if services.can_convert(from, to) {
        return true;
    }
    sig.is_varargs()
        && arg_count == sig.fixed_arity() + 1
        && index == sig.fixed_arity()
        && *from == to.array_of()
}

/// Link-time applicability against a call shape; Unknown positions keep
/// the candidate in contention
pub(super) fn static_applicable(
    sig: &MethodSignature,
    shape: &CallSiteDescriptor,
    services: &dyn LinkerServices,
) -> bool {
    if !matches_arity(sig, shape.arg_count()) {
        return false;
    }
    shape
        .static_types()
        .iter()
        .enumerate()
        .all(|(index, static_type)| match static_type {
            StaticType::Unknown => true,
            StaticType::Known(ty) => {
                convertible_at(sig, index, shape.arg_count(), ty, services)
            }
        })
}

/// Invocation-time applicability against concrete argument types
fn runtime_applicable(
    sig: &MethodSignature,
    args: &[Value],
    services: &dyn LinkerServices,
) -> bool {
    if !matches_arity(sig, args.len()) {
        return false;
    }
    args.iter().enumerate().all(|(index, arg)| {
        convertible_at(sig, index, args.len(), arg.type_key(), services)
    })
}

/// True if `a` is strictly more specific than `b` at the given call
/// arity: every governing parameter type of `a` is assignable to the
/// corresponding one of `b`, and at least one strictly narrower
fn more_specific(a: &MethodSignature, b: &MethodSignature, arg_count: usize) -> bool {
    let mut strictly = false;
    for index in 0..arg_count {
        let pa = param_type_at(a, index);
        let pb = param_type_at(b, index);
        if !pb.is_assignable_from(pa) {
            return false;
        }
        if pa != pb {
            strictly = true;
        }
    }
    strictly
}

/// Pick the unique most specific applicable candidate for the concrete
/// arguments, or fail with the deferred no-match/ambiguity error
fn select_runtime<'a>(
    name: &str,
    candidates: &'a [CandidateMethod],
    args: &[Value],
    services: &dyn LinkerServices,
) -> LinkResult<&'a CandidateMethod> {
    let mut applicable: Vec<&'a CandidateMethod> = candidates
        .iter()
        .filter(|m| runtime_applicable(m.signature(), args, services))
        .collect();
    if applicable.is_empty() {
        return Err(LinkError::NoMatch {
            name: name.to_string(),
            arg_types: describe_args(args),
        });
    }
    // Fixed-arity candidates shadow varargs candidates when both apply.
    if applicable.iter().any(|m| !m.signature().is_varargs()) {
        applicable.retain(|m| !m.signature().is_varargs());
    }
    let winners: Vec<&'a CandidateMethod> = applicable
        .iter()
        .enumerate()
        .filter(|(i, a)| {
            !applicable.iter().enumerate().any(|(j, b)| {
                j != *i && more_specific(b.signature(), a.signature(), args.len())
            })
        })
        .map(|(_, m)| *m)
        .collect();
    if winners.len() == 1 {
        Ok(winners[0])
    } else {
        Err(LinkError::Ambiguous {
            name: name.to_string(),
            arg_types: describe_args(args),
            candidates: winners
                .iter()
                .map(|m| format!("{:?}", m.signature()))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Adapt a resolved candidate for direct installation: fixed-arity
/// members link as-is, varargs members get a packing wrapper that keeps
/// the declaring signature
pub(super) fn adapt(candidate: &CandidateMethod) -> InvocableHandle {
    if !candidate.signature().is_varargs() {
        return candidate.handle().clone();
    }
    let signature = candidate.signature().clone();
    let inner = candidate.handle().clone();
    let packing_sig = signature.clone();
    InvocableHandle::direct(
        signature,
        Arc::new(move |args: &[Value]| {
            let packed = pack_args(&packing_sig, args)?;
            inner.invoke(&packed)
        }),
    )
}

/// Build the residual dispatcher over the surviving candidates
pub(super) fn residual_dispatcher(
    name: String,
    candidates: Vec<CandidateMethod>,
    services: Arc<dyn LinkerServices>,
) -> InvocableHandle {
    InvocableHandle::dispatcher(Arc::new(move |args: &[Value]| {
        let winner = select_runtime(&name, &candidates, args, services.as_ref())?;
        if winner.signature().is_varargs() {
            let packed = pack_args(winner.signature(), args)?;
            winner.handle().invoke(&packed)
        } else {
            winner.handle().invoke(args)
        }
    }))
}

/// Collect trailing arguments of a varargs call into one array value,
/// unless the single trailing argument already is that array
fn pack_args(sig: &MethodSignature, args: &[Value]) -> LinkResult<Vec<Value>> {
    let fixed = sig.fixed_arity();
    let Some(elem) = sig.vararg_element() else {
        return Ok(args.to_vec());
    };
    if args.len() < fixed {
        return Err(LinkError::NoMatch {
            name: sig.name().to_string(),
            arg_types: describe_args(args),
        });
    }
    if args.len() == fixed + 1 && args[fixed].type_key() == &elem.array_of() {
        return Ok(args.to_vec());
    }
    let mut packed = args[..fixed].to_vec();
    packed.push(Value::array(elem, args[fixed..].to_vec()));
    Ok(packed)
}

/// Render concrete argument types for error messages
fn describe_args(args: &[Value]) -> String {
    args.iter()
        .map(|v| v.type_key().name().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a call shape's static types for error messages
pub(super) fn describe_shape(shape: &CallSiteDescriptor) -> String {
    shape
        .static_types()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
