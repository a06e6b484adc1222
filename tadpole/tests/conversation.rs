//! Whole conversations run through [`Core`] against a mock
//! transport and a virtual clock.

use std::sync::{Arc, Mutex};

use embedded_time::duration::Milliseconds;
use embedded_time::rate::Fraction;
use embedded_time::Instant;
use tadpole::config::Config;
use tadpole::retry::{Attempts, Strategy};
use tadpole::{Addrd, Core, Event, Message, Transmit};
use tadpole_msg::{Code, Id, Token, TryFromBytes, TryIntoBytes, Type};

pub struct ClockMock;

impl embedded_time::Clock for ClockMock {
  type T = u64;

  const SCALING_FACTOR: Fraction = Fraction::new(1, 1000);

  fn try_now(&self) -> Result<Instant<Self>, embedded_time::clock::Error> {
    Ok(Instant::new(0))
  }
}

fn at(ms: u64) -> Instant<ClockMock> {
  Instant::new(ms)
}

/// A transport that remembers everything the engine sends
#[derive(Clone, Default)]
struct TxMock {
  sent: Arc<Mutex<Vec<Addrd<Vec<u8>>>>>,
}

impl TxMock {
  fn sent(&self) -> Vec<Addrd<Vec<u8>>> {
    self.sent.lock().unwrap().clone()
  }

  fn sent_msgs(&self) -> Vec<Message> {
    self.sent()
        .into_iter()
        .map(|d| Message::try_from_bytes(d.data()).unwrap())
        .collect()
  }
}

impl Transmit for TxMock {
  type Error = ();

  fn transmit(&mut self, dgram: Addrd<&[u8]>) -> Result<(), Self::Error> {
    self.sent.lock().unwrap().push(dgram.map(Vec::from));
    Ok(())
  }
}

fn peer() -> no_std_net::SocketAddr {
  use no_std_net::*;
  SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 5683))
}

fn flat_config() -> Config {
  // jitter off so timings are exact
  let mut cfg = Config::default();
  cfg.con.retry_strategy = Strategy::Exponential { init_min: Milliseconds(2_000),
                                                   init_max: Milliseconds(2_000) };
  cfg
}

fn core_with(cfg: Config) -> (Core<ClockMock, TxMock>, TxMock) {
  let _ = simple_logger::SimpleLogger::new().with_level(log::LevelFilter::Debug)
                                            .init();

  let tx = TxMock::default();
  (Core::new(tx.clone(), cfg), tx)
}

#[test]
fn confirmable_get_on_the_wire() {
  let (mut core, tx) = core_with(flat_config());

  let mut req = Message::new(Type::Con, Code::GET, Id(0x1234), Token(Default::default()));
  req.set_path("temp").unwrap();

  core.send(Addrd(req, peer()), at(0)).unwrap();

  let sent = tx.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].addr(), peer());
  assert_eq!(sent[0].data(),
             &vec![0x41, 0x01, 0x12, 0x34, 0x94, b't', b'e', b'm', b'p']);
}

#[test]
fn duplicate_reception_suppressed() {
  let (mut core, _tx) = core_with(flat_config());

  let mut req = Message::new(Type::Con, Code::PUT, Id(9), Token(Default::default()));
  req.set_path("a").unwrap();
  let bytes: Vec<u8> = req.try_into_bytes().unwrap();

  let first = core.handle_rx(Addrd(&bytes, peer()), at(0)).unwrap();
  assert!(matches!(first, Some(Event::Msg(_))));

  // the same datagram again 5 seconds later: swallowed
  let second = core.handle_rx(Addrd(&bytes, peer()), at(5_000)).unwrap();
  assert_eq!(second, None);
}

#[test]
fn unacked_confirmable_retransmits_then_times_out() {
  let (mut core, tx) = core_with(flat_config());

  let req = Message::new(Type::Con, Code::GET, Id(7), Token(Default::default()));
  core.send(Addrd(req, peer()), at(0)).unwrap();
  assert_eq!(tx.sent().len(), 1);

  // nothing due before the first interval elapses
  assert_eq!(core.tick(at(1_999)).unwrap(), vec![]);
  assert_eq!(tx.sent().len(), 1);

  // binary exponential back-off from the initial 2 second delay
  for (expected_emissions, due_ms) in [(2usize, 2_000u64), (3, 4_000), (4, 8_000), (5, 16_000)] {
    assert_eq!(core.tick(at(due_ms)).unwrap(), vec![]);
    assert_eq!(tx.sent().len(), expected_emissions);
  }

  // every emission is the identical datagram
  let sent = tx.sent();
  assert!(sent.iter().all(|d| d == &sent[0]));

  // silence through the final wait surfaces the timeout
  assert_eq!(core.tick(at(31_999)).unwrap(), vec![]);
  assert_eq!(core.tick(at(32_000)).unwrap(),
             vec![Event::TimedOut(Addrd(Id(7), peer()))]);

  // and the engine is done with the exchange
  assert_eq!(core.tick(at(64_000)).unwrap(), vec![]);
  assert_eq!(tx.sent().len(), 5);
}

#[test]
fn ack_cancels_retransmission() {
  let (mut core, tx) = core_with(flat_config());

  let req = Message::new(Type::Con, Code::GET, Id(7), Token(Default::default()));
  let ack_bytes: Vec<u8> = req.ack().try_into_bytes().unwrap();
  core.send(Addrd(req, peer()), at(0)).unwrap();

  let ev = core.handle_rx(Addrd(&ack_bytes, peer()), at(500)).unwrap();
  assert_eq!(ev, Some(Event::Acked(Addrd(Id(7), peer()))));

  // no retransmission, no timeout, ever
  for ms in [2_000u64, 16_000, 32_000, 64_000] {
    assert_eq!(core.tick(at(ms)).unwrap(), vec![]);
  }
  assert_eq!(tx.sent().len(), 1);
}

#[test]
fn reset_cancels_and_surfaces() {
  let (mut core, _tx) = core_with(flat_config());

  let req = Message::new(Type::Con, Code::GET, Id(7), Token(Default::default()));
  core.send(Addrd(req, peer()), at(0)).unwrap();

  let rst = Message::new(Type::Reset, Code::EMPTY, Id(7), Token(Default::default()));
  let rst_bytes: Vec<u8> = rst.try_into_bytes().unwrap();

  let ev = core.handle_rx(Addrd(&rst_bytes, peer()), at(500)).unwrap();
  assert_eq!(ev, Some(Event::Reset(Addrd(Id(7), peer()))));

  assert_eq!(core.tick(at(32_000)).unwrap(), vec![]);
}

#[test]
fn blockwise_upload_driven_by_acknowledgements() {
  let mut cfg = flat_config();
  cfg.block.block_size = 16;
  let (mut core, tx) = core_with(cfg);

  let payload = (0..50u8).collect::<Vec<_>>();
  let mut req = Message::new(Type::Con, Code::PUT, Id(100), Token::from([0xaa]));
  req.set_path("fw").unwrap();
  req.payload = tadpole_msg::Payload(payload.clone());

  core.send(Addrd(req, peer()), at(0)).unwrap();

  // only block 0 went out
  assert_eq!(tx.sent().len(), 1);

  // the peer acknowledges each block, asking for the next
  for n in 1..=3u32 {
    let acked_id = Id(100 + (n as u16) - 1);
    let mut ack = Message::new(Type::Ack, Code::EMPTY, acked_id, Token(Default::default()));
    ack.set_block1(16, n, true).unwrap();
    let bytes: Vec<u8> = ack.try_into_bytes().unwrap();

    core.handle_rx(Addrd(&bytes, peer()), at(u64::from(n) * 100)).unwrap();
    assert_eq!(tx.sent().len(), 1 + n as usize);
  }

  let sent = tx.sent_msgs();
  assert_eq!(sent.len(), 4);

  // 50 bytes in 16-byte blocks: 16 + 16 + 16 + 2, numbered 0-3,
  // only the last with the more-flag clear
  let blocks = sent.iter()
                   .map(|m| m.block1().unwrap())
                   .collect::<Vec<_>>();
  assert_eq!(blocks.iter().map(|b| b.num()).collect::<Vec<_>>(),
             vec![0, 1, 2, 3]);
  assert_eq!(blocks.iter().map(|b| b.more()).collect::<Vec<_>>(),
             vec![true, true, true, false]);

  let reassembled = sent.iter()
                        .flat_map(|m| m.payload.as_bytes().iter().copied())
                        .collect::<Vec<_>>();
  assert_eq!(reassembled, payload);

  // every block keeps the template's options & token
  assert!(sent.iter()
              .all(|m| m.path::<Vec<_>>() == Ok(vec!["fw"]) && m.token == Token::from([0xaa])));
}

#[test]
fn blockwise_reception_yields_one_logical_message() {
  let mut cfg = flat_config();
  cfg.block.block_size = 16;
  let (mut core, _tx) = core_with(cfg);

  let chunks: [&[u8]; 3] = [&[1; 16], &[2; 16], &[3; 5]];

  for (n, chunk) in chunks.iter().enumerate() {
    let more = n < 2;
    let mut frag = Message::new(Type::Non, Code::PUT, Id(40 + n as u16), Token::from([7]));
    frag.set_block1(16, n as u32, more).unwrap();
    frag.payload = tadpole_msg::Payload(chunk.to_vec());
    let bytes: Vec<u8> = frag.try_into_bytes().unwrap();

    let ev = core.handle_rx(Addrd(&bytes, peer()), at(n as u64 * 100)).unwrap();

    match (more, ev) {
      | (true, None) => (),
      | (false, Some(Event::Msg(msg))) => {
        let mut expect = vec![1u8; 16];
        expect.extend([2; 16]);
        expect.extend([3; 5]);
        assert_eq!(msg.data().payload.as_bytes(), &expect);
        assert!(msg.data().block1().is_none());
        assert_eq!(msg.data().token, Token::from([7]));
      },
      | (more, ev) => panic!("fragment {} (more: {}) yielded {:?}", n, more, ev),
    }
  }
}

#[test]
fn oversized_blockwise_reception_is_refused() {
  let mut cfg = flat_config();
  cfg.block.block_size = 16;
  cfg.block.max_message_size = 24;
  let (mut core, _tx) = core_with(cfg);

  let mut frag = |n: u32, payload: &[u8]| {
    let mut m = Message::new(Type::Non, Code::PUT, Id(60 + n as u16), Token::from([7]));
    m.set_block1(16, n, true).unwrap();
    m.payload = tadpole_msg::Payload(payload.to_vec());
    let bytes: Vec<u8> = m.try_into_bytes().unwrap();
    core.handle_rx(Addrd(&bytes, peer()), at(u64::from(n)))
  };

  assert_eq!(frag(0, &[1; 16]), Ok(None));
  assert_eq!(frag(1, &[2; 16]),
             Err(tadpole::core::Error::BlockwiseTooLarge(Addrd(Token::from([7]), peer()))));
}

#[test]
fn garbage_datagram_is_a_parse_error() {
  let (mut core, _tx) = core_with(flat_config());

  assert!(matches!(core.handle_rx(Addrd(&[0x41][..], peer()), at(0)),
                   Err(tadpole::core::Error::Parse(_))));
}
