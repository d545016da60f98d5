use crate::proto::{AckOutcome, SenderStatus, SenderWindow};

fn send_all_in_window(w: &mut SenderWindow) -> Vec<u64> {
    let mut sent = Vec::new();
    while let Some(seq) = w.next_to_send() {
        assert!(w.mark_sent(seq));
        sent.push(seq);
    }
    sent
}

#[test]
fn can_send_only_unsent_packets_inside_the_window() {
    let mut w = SenderWindow::new(3, 5);
    assert!(w.can_send(0));
    assert!(w.can_send(2));
    assert!(!w.can_send(3), "outside window");
    assert!(!w.can_send(9), "beyond total");

    assert!(w.mark_sent(0));
    assert!(!w.can_send(0), "already sent");
    assert!(!w.mark_sent(0));
    assert!(!w.mark_sent(4));
    assert_eq!(w.status(4), Some(SenderStatus::Unsent));
}

#[test]
fn next_to_send_stops_at_the_window_edge() {
    let mut w = SenderWindow::new(4, 6);
    assert_eq!(send_all_in_window(&mut w), vec![0, 1, 2, 3]);
    assert_eq!(w.next_seq_num(), 4);
    assert_eq!(w.next_to_send(), None);
    assert_eq!(w.next_seq_num(), 4);
    assert_eq!(w.in_flight().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
}

#[test]
fn out_of_order_ack_does_not_slide_until_gap_closes() {
    let mut w = SenderWindow::new(4, 6);
    send_all_in_window(&mut w);

    assert_eq!(w.mark_acked(1), AckOutcome::Acked { slide: 0 });
    assert_eq!(w.base(), 0);

    assert_eq!(w.mark_acked(0), AckOutcome::Acked { slide: 2 });
    assert_eq!(w.base(), 2);
    assert_eq!(w.window(), 2..6);
    assert_eq!(w.in_flight().collect::<Vec<_>>(), vec![2, 3]);

    // New space: 4 and 5 become sendable.
    assert_eq!(send_all_in_window(&mut w), vec![4, 5]);
}

#[test]
fn ack_outside_window_or_duplicate_is_a_no_op() {
    let mut w = SenderWindow::new(2, 4);
    send_all_in_window(&mut w);

    assert_eq!(w.mark_acked(3), AckOutcome::OutsideWindow);
    assert_eq!(w.mark_acked(0).slide_distance(), 1);
    assert_eq!(w.mark_acked(0), AckOutcome::OutsideWindow, "below base now");

    assert_eq!(send_all_in_window(&mut w), vec![2]);
    assert_eq!(w.mark_acked(2), AckOutcome::Acked { slide: 0 });
    assert_eq!(w.mark_acked(2), AckOutcome::Duplicate);
    assert_eq!(w.mark_acked(2).slide_distance(), 0);
    assert_eq!(w.base(), 1);
}

#[test]
fn timed_out_packet_can_be_acked_and_slides() {
    let mut w = SenderWindow::new(2, 2);
    send_all_in_window(&mut w);

    assert!(w.mark_timed_out(0));
    assert_eq!(w.status(0), Some(SenderStatus::TimedOut));
    assert_eq!(w.in_flight().collect::<Vec<_>>(), vec![1]);

    assert_eq!(w.mark_acked(1), AckOutcome::Acked { slide: 0 });
    assert_eq!(w.mark_acked(0), AckOutcome::Acked { slide: 2 });
    assert_eq!(w.base(), 2);
    assert!(w.all_acked());
}

#[test]
fn late_timeout_after_ack_is_ignored() {
    let mut w = SenderWindow::new(2, 4);
    send_all_in_window(&mut w);
    w.mark_acked(1);

    assert!(!w.mark_timed_out(1));
    assert_eq!(w.status(1), Some(SenderStatus::Acked));
    assert!(!w.prepare_retransmit(1));
    assert_eq!(w.status(1), Some(SenderStatus::Acked));
}

#[test]
fn retransmit_goes_back_through_unsent() {
    let mut w = SenderWindow::new(2, 4);
    send_all_in_window(&mut w);

    assert!(!w.prepare_retransmit(0), "only timed-out packets are reset");
    w.mark_timed_out(0);
    assert!(w.prepare_retransmit(0));
    assert_eq!(w.status(0), Some(SenderStatus::Unsent));
    assert!(w.can_send(0));
    assert!(w.mark_sent(0));
    assert_eq!(w.in_flight().collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn base_reaches_total_when_everything_is_acked() {
    let mut w = SenderWindow::new(3, 3);
    send_all_in_window(&mut w);
    w.mark_acked(2);
    w.mark_acked(1);
    assert!(!w.all_acked());
    assert_eq!(w.mark_acked(0), AckOutcome::Acked { slide: 3 });
    assert_eq!(w.base(), 3);
    assert_eq!(w.next_seq_num(), 3);
    assert!(w.window().is_empty());
    assert!(w.all_acked());
}
