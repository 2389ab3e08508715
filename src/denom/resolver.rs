use crate::{
    denom::trace::{DenomTrace, denom_prefix},
    error::RateLimitError,
    types::{Denom, Packet, PacketDirection},
};

pub fn resolve_denom(
    direction: PacketDirection,
    packet: &Packet,
    raw_denom: &str,
) -> Result<Denom, RateLimitError> {
    match direction {
        PacketDirection::Send => resolve_send_denom(raw_denom),
        PacketDirection::Receive => resolve_receive_denom(packet, raw_denom),
    }
}

/// Native tokens keep their denom, tokens that arrived over a channel are
/// keyed by the hash of their trace.
pub fn resolve_send_denom(raw_denom: &str) -> Result<Denom, RateLimitError> {
    let trace = DenomTrace::parse(raw_denom)?;
    if trace.is_native() {
        return Ok(raw_denom.to_string());
    }
    Ok(trace.ibc_denom())
}

/// On receive the local chain is either the source of the token (the packet
/// undoes a hop we created, so our prefix is removed) or a sink (the packet
/// adds a hop, so our destination prefix is prepended).
pub fn resolve_receive_denom(packet: &Packet, raw_denom: &str) -> Result<Denom, RateLimitError> {
    DenomTrace::parse(raw_denom)?;

    let source_prefix = denom_prefix(&packet.source_port, &packet.source_channel);
    if let Some(unprefixed) = raw_denom.strip_prefix(source_prefix.as_str()) {
        let trace = DenomTrace::parse(unprefixed)?;
        if trace.is_native() {
            return Ok(unprefixed.to_string());
        }
        return Ok(trace.ibc_denom());
    }

    let destination_prefix = denom_prefix(&packet.destination_port, &packet.destination_channel);
    let prefixed = format!("{destination_prefix}{raw_denom}");
    Ok(DenomTrace::parse(&prefixed)?.ibc_denom())
}
