use serde::{Deserialize, Serialize};

use crate::{
    denom::{is_valid_channel_id, is_valid_port_id, resolve_denom},
    error::{RateLimitError, malformed_packet},
    types::{Amount, Packet, PacketDirection, TransferRecord},
};

/// ICS-20 transfer payload carried in `Packet::data`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FungibleTokenPacketData {
    #[serde(default)]
    pub denom: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub receiver: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub memo: String,
}

impl FungibleTokenPacketData {
    pub fn to_bytes(&self) -> Result<Vec<u8>, RateLimitError> {
        serde_json::to_vec(self)
            .map_err(|err| malformed_packet(format!("failed to encode transfer packet data: {err}")))
    }
}

pub fn decode_packet_data(data: &[u8]) -> Result<FungibleTokenPacketData, RateLimitError> {
    serde_json::from_slice(data)
        .map_err(|err| malformed_packet(format!("cannot unmarshal transfer packet data: {err}")))
}

/// The local channel is the accounting key: the source channel for packets we
/// send, the destination channel for packets we receive.
pub fn extract_transfer_record(
    packet: &Packet,
    direction: PacketDirection,
) -> Result<TransferRecord, RateLimitError> {
    let packet_data = decode_packet_data(&packet.data)?;
    validate_packet_identifiers(packet)?;

    let channel_id = match direction {
        PacketDirection::Send => packet.source_channel.clone(),
        PacketDirection::Receive => packet.destination_channel.clone(),
    };
    let denom = resolve_denom(direction, packet, &packet_data.denom)?;
    let amount: Amount = packet_data.amount.parse()?;

    Ok(TransferRecord {
        channel_id,
        denom,
        amount,
        sender: packet_data.sender,
        receiver: packet_data.receiver,
    })
}

fn validate_packet_identifiers(packet: &Packet) -> Result<(), RateLimitError> {
    for port_id in [&packet.source_port, &packet.destination_port] {
        if !is_valid_port_id(port_id) {
            return Err(malformed_packet(format!(
                "packet {} has invalid port identifier '{port_id}'",
                packet.sequence
            )));
        }
    }
    for channel_id in [&packet.source_channel, &packet.destination_channel] {
        if !is_valid_channel_id(channel_id) {
            return Err(malformed_packet(format!(
                "packet {} has invalid channel identifier '{channel_id}'",
                packet.sequence
            )));
        }
    }
    Ok(())
}
