use super::*;

#[test]
fn table_bounds_channel_count() {
    assert!(ChannelTable::new(0).is_err());
    assert!(ChannelTable::new(25).is_err());
    let t = ChannelTable::new(24).unwrap();
    assert_eq!(t.len(), 24);
    assert!(t.iter().all(|c| c == ChannelType::NONE));
}

#[test]
fn out_of_range_index_is_invalid_and_does_not_mutate() {
    let mut t = ChannelTable::new(2).unwrap();
    assert_eq!(t.get(2), None);
    assert_eq!(t.set(2, ChannelType::ws281x()), None);
    assert_eq!(t, ChannelTable::new(2).unwrap());
}

#[test]
fn set_returns_previous_type() {
    let mut t = ChannelTable::new(3).unwrap();
    assert_eq!(t.set(1, ChannelType::ws281x()), Some(ChannelType::NONE));
    assert_eq!(
        t.set(1, ChannelType::charlieplex()),
        Some(ChannelType::ws281x())
    );
    assert_eq!(t.get(1), Some(ChannelType::charlieplex()));
}

#[test]
fn byte_form_round_trips() {
    let t = ChannelType::charlieplex().with(ChannelFlags::CHECKSUM | ChannelFlags::ACTIVE_HIGH);
    assert_eq!(t.to_byte(), 0xC3);
    assert_eq!(ChannelType::from_byte(0xC3).unwrap(), t);
    assert_eq!(
        ChannelType::from_byte(0x21).unwrap(),
        ChannelType::ws281x().with(ChannelFlags::RG_SWAP)
    );
    assert!(ChannelType::from_byte(0x05).is_err());
    assert!(ChannelType::from_byte(0x11).is_err());
}

#[test]
fn encodable_combinations() {
    assert!(ChannelType::ws281x().check_encodable().is_ok());
    assert!(
        ChannelType::ws281x()
            .with(ChannelFlags::RG_SWAP)
            .check_encodable()
            .is_ok()
    );
    assert!(
        ChannelType::ws281x()
            .with(ChannelFlags::CHECKSUM)
            .check_encodable()
            .is_err()
    );
    assert!(
        ChannelType::charlieplex()
            .with(ChannelFlags::CHECKSUM | ChannelFlags::ACTIVE_HIGH)
            .check_encodable()
            .is_ok()
    );
    assert!(
        ChannelType::charlieplex()
            .with(ChannelFlags::RG_SWAP)
            .check_encodable()
            .is_err()
    );
    assert!(ChannelType::NONE.check_encodable().is_err());
    assert!(
        ChannelType::new(Protocol::PlainSsr, ChannelFlags::empty())
            .check_encodable()
            .is_err()
    );
}

#[test]
fn text_form_parses_and_displays() {
    let t: ChannelType = "chplex+checksum".parse().unwrap();
    assert_eq!(t, ChannelType::charlieplex().with(ChannelFlags::CHECKSUM));
    assert_eq!(t.to_string(), "chplex+checksum");
    assert_eq!(
        "WS281X+rg_swap".parse::<ChannelType>().unwrap(),
        ChannelType::ws281x().with(ChannelFlags::RG_SWAP)
    );
    assert!("dmx".parse::<ChannelType>().is_err());
    assert!("ws281x+bogus".parse::<ChannelType>().is_err());
}

#[test]
fn flag_set_rejects_unknown_bits_and_names() {
    assert_eq!(
        ChannelFlags::from_bits(0x60),
        Some(ChannelFlags::CHECKSUM | ChannelFlags::ACTIVE_HIGH)
    );
    assert_eq!(ChannelFlags::from_bits(0x10), None);
    assert!(ChannelFlags::default().is_empty());

    let all = ChannelType::charlieplex().with(ChannelFlags::all());
    assert_eq!(all.to_string(), "chplex+rg_swap+checksum+active_high");
    assert_eq!(
        "chplex+polarity".parse::<ChannelType>().unwrap(),
        ChannelType::charlieplex().with(ChannelFlags::ACTIVE_HIGH)
    );
}

#[test]
fn channel_type_serializes_through_serde() {
    let t = ChannelType::ws281x().with(ChannelFlags::RG_SWAP);
    let json = serde_json::to_string(&t).unwrap();
    let back: ChannelType = serde_json::from_str(&json).unwrap();
    assert_eq!(back, t);
}
