use crate::foundation::core::ChannelPolicy;

/// `(c - mid_gray) * gain_tenths / 10`, narrowed to a byte per `policy`.
///
/// Evaluated exactly in integer tenths so `-178.5` is really `-178.5`.
pub(crate) fn stealth_channel(c: u8, mid_gray: u8, gain_tenths: u16, policy: ChannelPolicy) -> u8 {
    let tenths = (i32::from(c) - i32::from(mid_gray)) * i32::from(gain_tenths);
    narrow_tenths(tenths, policy)
}

pub(crate) fn narrow_tenths(tenths: i32, policy: ChannelPolicy) -> u8 {
    match policy {
        ChannelPolicy::Clamp => round_tenths_ties_even(tenths).clamp(0, 255) as u8,
        // Integer division truncates toward zero.
        ChannelPolicy::Wrap => (tenths / 10).rem_euclid(256) as u8,
    }
}

fn round_tenths_ties_even(tenths: i32) -> i32 {
    let q = tenths.div_euclid(10);
    let r = tenths.rem_euclid(10);
    if r > 5 || (r == 5 && q.rem_euclid(2) == 1) {
        q + 1
    } else {
        q
    }
}
