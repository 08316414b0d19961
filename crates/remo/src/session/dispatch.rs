// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Incoming message dispatch.
//!
//! Routes a received frame by (service, object, action): Calls hit the
//! method table (or a property slot, get by zero-arity and set by
//! one-arity), Post and Event hit the signal table. Unknown ids and
//! semantic failures answer with a typed Error reply and leave the socket
//! open; only framing-level violations (handled by the session reader)
//! close it.

use crate::dynamic::{convert, Value};
use crate::error::{Error, ErrorCode};
use crate::session::host::Router;
use crate::wire::{
    decode_values, encode_value, encode_values, parse_signature_list, Message, MessageKind,
};

/// Handle one routed message, producing a reply frame when one is due.
pub(crate) fn dispatch(router: &Router, msg: &Message) -> Option<Message> {
    match msg.kind {
        MessageKind::Call => Some(dispatch_call(router, msg)),
        MessageKind::Post | MessageKind::Event => {
            dispatch_signal(router, msg);
            None
        }
        MessageKind::Cancel => {
            // Calls are serviced inline on receipt, so by the time a cancel
            // frame arrives its target has already completed; the caller
            // side has completed locally with Cancelled either way.
            log::debug!("cancel for message {} arrived after completion", msg.id);
            None
        }
        MessageKind::Reply | MessageKind::Error | MessageKind::Capability => {
            log::warn!(
                "unroutable {:?} message {} reached the dispatcher",
                msg.kind,
                msg.id
            );
            None
        }
    }
}

fn dispatch_call(router: &Router, msg: &Message) -> Message {
    let Some(object) = router.find(msg.service, msg.object) else {
        return error_reply(
            msg,
            ErrorCode::NotFound,
            format!("no object {} in service {}", msg.object, msg.service),
        );
    };

    let args = match decode_arguments(msg) {
        Ok(args) => args,
        Err(e) => return error_reply(msg, e.code(), e.to_string()),
    };

    if let Some(function) = object.method(msg.action) {
        // Adapt every argument to the declared parameter shape before the
        // strict re-cast inside the adapter.
        let expected = function.argument_types();
        if args.len() != expected.len() {
            return error_reply(
                msg,
                ErrorCode::ConversionFailed,
                format!(
                    "method {} takes {} arguments, got {}",
                    msg.action,
                    expected.len(),
                    args.len()
                ),
            );
        }
        let mut adapted = Vec::with_capacity(args.len());
        for (arg, target) in args.iter().zip(expected.iter()) {
            match convert(arg, target) {
                Some(converted) => adapted.push(converted.into_owned()),
                None => {
                    return error_reply(
                        msg,
                        ErrorCode::ConversionFailed,
                        format!(
                            "argument not convertible to {} for method {}",
                            target.name(),
                            msg.action
                        ),
                    )
                }
            }
        }
        return match function.call(&adapted) {
            Ok(result) => value_reply(msg, &result),
            Err(e) => error_reply(msg, e.code(), e.to_string()),
        };
    }

    if let Some(property) = object.property(msg.action) {
        return match args.len() {
            0 => value_reply(msg, &property.get()),
            1 => match property.set(&args[0]) {
                Ok(()) => value_reply(msg, &Value::void()),
                Err(e) => error_reply(msg, e.code(), e.to_string()),
            },
            n => error_reply(
                msg,
                ErrorCode::ConversionFailed,
                format!("property access takes 0 or 1 arguments, got {}", n),
            ),
        };
    }

    if object.meta().signal(msg.action).is_some() {
        return error_reply(
            msg,
            ErrorCode::NotFound,
            format!("action {} is a signal, not callable", msg.action),
        );
    }

    error_reply(
        msg,
        ErrorCode::NotFound,
        format!("no action {} on object {}", msg.action, msg.object),
    )
}

fn dispatch_signal(router: &Router, msg: &Message) {
    let Some(object) = router.find(msg.service, msg.object) else {
        log::debug!(
            "dropping {:?} for unknown object ({}, {})",
            msg.kind,
            msg.service,
            msg.object
        );
        return;
    };
    let Some(signal) = object.signal(msg.action) else {
        log::debug!(
            "dropping {:?} for unknown signal {} on object {}",
            msg.kind,
            msg.action,
            msg.object
        );
        return;
    };
    let args = match decode_arguments(msg) {
        Ok(args) => args,
        Err(e) => {
            log::warn!("undecodable signal payload for action {}: {}", msg.action, e);
            return;
        }
    };

    let host = router.service_host(msg.service);
    signal.emit(
        &args,
        Some(&|target, method, forwarded: &[Value]| {
            let object = host
                .as_ref()
                .and_then(|h| h.get(target))
                .ok_or_else(|| Error::NotFound(format!("forward target {:?}", target)))?;
            let function = object
                .method(method)
                .ok_or_else(|| Error::NotFound(format!("forward method {}", method)))?;
            function.call(forwarded).map(|_| ())
        }),
    );
}

fn decode_arguments(msg: &Message) -> crate::Result<Vec<Value>> {
    if msg.signature.is_empty() {
        if msg.payload.is_empty() {
            return Ok(Vec::new());
        }
        return Err(Error::Protocol("payload without a signature".to_string()));
    }
    let members = parse_signature_list(&msg.signature)?;
    decode_values(&members, &msg.payload)
}

fn value_reply(request: &Message, value: &Value) -> Message {
    let mut payload = Vec::new();
    let signature = match value.descriptor() {
        Some(desc) => {
            if let Err(e) = encode_value(value, &mut payload) {
                return error_reply(request, e.code(), e.to_string());
            }
            desc.signature()
        }
        None => String::from("v"),
    };
    Message {
        id: request.id,
        service: request.service,
        object: request.object,
        action: request.action,
        kind: MessageKind::Reply,
        signature,
        payload,
    }
}

/// Build a typed error reply: `(code, text)` under the `(Is)` signature.
pub(crate) fn error_reply(request: &Message, code: ErrorCode, text: String) -> Message {
    log::debug!(
        "typed error for call {}: {} ({})",
        request.id,
        text,
        code.name()
    );
    let mut payload = Vec::new();
    let values = [
        crate::dynamic::IntoValue::into_value(code.as_u32()),
        crate::dynamic::IntoValue::into_value(text),
    ];
    // Encoding scalars into a fresh buffer cannot fail.
    let _ = encode_values(&values, &mut payload);
    Message {
        id: request.id,
        service: request.service,
        object: request.object,
        action: request.action,
        kind: MessageKind::Error,
        signature: "(Is)".to_string(),
        payload,
    }
}

/// Decode a typed error payload back into the taxonomy.
pub(crate) fn decode_error(msg: &Message) -> Error {
    let parsed = parse_signature_list(&msg.signature)
        .and_then(|members| decode_values(&members, &msg.payload));
    match parsed {
        Ok(values) if values.len() == 2 => {
            let code = values[0]
                .to_uint()
                .map(|c| ErrorCode::from_u32(c as u32))
                .unwrap_or(ErrorCode::ProtocolError);
            let text = values[1].to_str().unwrap_or("").to_string();
            Error::from_code(code, text)
        }
        _ => Error::Protocol("malformed error reply".to_string()),
    }
}
