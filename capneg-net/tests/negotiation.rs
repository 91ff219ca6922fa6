mod common;

use std::time::Duration;

use capneg_core::AcceptAll;
use capneg_types::{
    marshalling, ChannelAddress, ChannelInGroup, Message, MessageKind, Muid, NakStatus,
    ProfileAtAddress, SupportedAndActive,
};

use common::{profile, RawPeer, SERVER_MUID};

const TIMEOUT: Duration = Duration::from_secs(2);

#[test]
fn test_inquiry_reply_goes_to_requester_only() {
    let (mut server, addr) = common::bind_server(AcceptAll);
    server
        .host_mut()
        .add_profile(ProfileAtAddress::new(profile(1), ChannelAddress::channel(0, 0)), 1);

    let mut alice = RawPeer::connect(&addr, 0x100).unwrap();
    let mut bob = RawPeer::connect(&addr, 0x200).unwrap();
    common::drive_until_peers(&mut server, 2, TIMEOUT);

    alice
        .request(0, ChannelInGroup::Channel(0), Message::ProfileInquiry)
        .unwrap();
    common::drive_until_handled(&mut server, 1, TIMEOUT);

    let reply = alice.recv().unwrap();
    assert_eq!(reply.header.kind, MessageKind::ProfileInquiryResponse);
    assert_eq!(reply.header.source, Muid::new(SERVER_MUID));
    assert_eq!(reply.header.destination, alice.muid);
    assert_eq!(
        reply.message,
        Message::ProfileInquiryResponse {
            active: vec![],
            inactive: vec![profile(1)],
        }
    );
    bob.expect_silence();
}

#[test]
fn test_group_inquiry_gets_one_reply() {
    let (mut server, addr) = common::bind_server(AcceptAll);
    server
        .host_mut()
        .add_profile(ProfileAtAddress::new(profile(4), ChannelAddress::whole_group(0)), 1);

    let mut alice = RawPeer::connect(&addr, 0x100).unwrap();
    common::drive_until_peers(&mut server, 1, TIMEOUT);

    alice
        .request(0, ChannelInGroup::WholeGroup, Message::ProfileInquiry)
        .unwrap();
    common::drive_until_handled(&mut server, 1, TIMEOUT);

    let reply = alice.recv().unwrap();
    assert_eq!(reply.group, 0);
    assert_eq!(reply.header.channel, ChannelInGroup::WholeGroup);
    assert_eq!(reply.header.destination, alice.muid);
    assert_eq!(
        reply.message,
        Message::ProfileInquiryResponse {
            active: vec![],
            inactive: vec![profile(4)],
        }
    );
    alice.expect_silence();
}

#[test]
fn test_profile_on_is_broadcast_to_every_peer() {
    let (mut server, addr) = common::bind_server(AcceptAll);
    let pair = ProfileAtAddress::new(profile(1), ChannelAddress::channel(0, 2));
    server.host_mut().add_profile(pair, 4);

    let mut alice = RawPeer::connect(&addr, 0x100).unwrap();
    let mut bob = RawPeer::connect(&addr, 0x200).unwrap();
    common::drive_until_peers(&mut server, 2, TIMEOUT);

    alice
        .request(
            0,
            ChannelInGroup::Channel(2),
            Message::ProfileOn {
                profile: profile(1),
                num_channels: 6,
            },
        )
        .unwrap();
    common::drive_until_handled(&mut server, 1, TIMEOUT);

    assert_eq!(
        server.host().get_state(pair),
        SupportedAndActive {
            supported: 4,
            active: 4
        }
    );

    for peer in [&mut alice, &mut bob] {
        let report = peer.recv().unwrap();
        assert_eq!(report.header.destination, Muid::BROADCAST);
        assert_eq!(report.header.channel, ChannelInGroup::Channel(2));
        assert_eq!(
            report.message,
            Message::ProfileEnabledReport {
                profile: profile(1),
                num_channels: 4,
            }
        );
    }
    // The delegate's change is not echoed a second time.
    alice.expect_silence();
}

#[test]
fn test_unsupported_profile_is_nakked() {
    let (mut server, addr) = common::bind_server(AcceptAll);

    let mut alice = RawPeer::connect(&addr, 0x100).unwrap();
    let mut bob = RawPeer::connect(&addr, 0x200).unwrap();
    common::drive_until_peers(&mut server, 2, TIMEOUT);

    alice
        .request(0, ChannelInGroup::Channel(0), Message::ProfileOff { profile: profile(3) })
        .unwrap();
    common::drive_until_handled(&mut server, 1, TIMEOUT);

    let reply = alice.recv().unwrap();
    assert_eq!(reply.header.destination, alice.muid);
    assert_eq!(
        reply.message,
        Message::Nak {
            original_kind: MessageKind::ProfileOff.sub_id(),
            status: NakStatus::NAK,
        }
    );
    bob.expect_silence();
    assert!(!server.host().is_responder());
}

#[test]
fn test_details_request() {
    let (mut server, addr) = common::bind_server(AcceptAll);
    let pair = ProfileAtAddress::new(profile(1), ChannelAddress::channel(0, 0));
    server.host_mut().add_profile(pair, 3);
    server.host_mut().enable_profile(pair, 2);

    let mut alice = RawPeer::connect(&addr, 0x100).unwrap();
    common::drive_until_peers(&mut server, 1, TIMEOUT);

    alice
        .request(
            0,
            ChannelInGroup::Channel(0),
            Message::ProfileDetails {
                profile: profile(1),
                target: 0,
            },
        )
        .unwrap();
    alice
        .request(
            0,
            ChannelInGroup::Channel(0),
            Message::ProfileDetails {
                profile: profile(1),
                target: 5,
            },
        )
        .unwrap();
    common::drive_until_handled(&mut server, 2, TIMEOUT);

    match alice.recv().unwrap().message {
        Message::ProfileDetailsResponse { profile: p, target, data } => {
            assert_eq!(p, profile(1));
            assert_eq!(target, 0);
            assert_eq!(marshalling::read_details(&data), Some((2, 3)));
        }
        other => panic!("Expected ProfileDetailsResponse, got {:?}", other),
    }
    assert_eq!(
        alice.recv().unwrap().message,
        Message::Nak {
            original_kind: MessageKind::ProfileDetails.sub_id(),
            status: NakStatus::UNSUPPORTED_TARGET,
        }
    );
    assert_eq!(server.host().get_state(pair).active, 2);
}

#[test]
fn test_block_inquiry_ends_with_block_reply() {
    let (mut server, addr) = common::bind_server(AcceptAll);
    server
        .host_mut()
        .add_profile(ProfileAtAddress::new(profile(1), ChannelAddress::channel(0, 5)), 1);
    server
        .host_mut()
        .add_profile(ProfileAtAddress::new(profile(2), ChannelAddress::whole_group(0)), 1);

    let mut alice = RawPeer::connect(&addr, 0x100).unwrap();
    common::drive_until_peers(&mut server, 1, TIMEOUT);

    alice
        .request(0, ChannelInGroup::WholeBlock, Message::ProfileInquiry)
        .unwrap();
    common::drive_until_handled(&mut server, 1, TIMEOUT);

    let channels: Vec<ChannelInGroup> = (0..3)
        .map(|_| alice.recv().unwrap().header.channel)
        .collect();
    assert_eq!(
        channels,
        vec![
            ChannelInGroup::Channel(5),
            ChannelInGroup::WholeGroup,
            ChannelInGroup::WholeBlock,
        ]
    );
    alice.expect_silence();
}

#[test]
fn test_packets_for_other_endpoints_are_ignored() {
    let (mut server, addr) = common::bind_server(AcceptAll);

    let mut alice = RawPeer::connect(&addr, 0x100).unwrap();
    common::drive_until_peers(&mut server, 1, TIMEOUT);

    let mut header = alice.header(ChannelInGroup::Channel(0), &Message::ProfileInquiry);
    header.destination = Muid::new(0x999);
    alice
        .send(&capneg_net::Packet::new(0, header, Message::ProfileInquiry))
        .unwrap();
    alice
        .request(0, ChannelInGroup::Channel(1), Message::ProfileInquiry)
        .unwrap();
    common::drive_until_handled(&mut server, 1, TIMEOUT);

    let reply = alice.recv().unwrap();
    assert_eq!(reply.header.channel, ChannelInGroup::Channel(1));
    alice.expect_silence();
}
