// Copyright 2021 bmc::labs Gmbh. All rights reserved.
//
// Authors:
//   Florian Eich <florian@bmc-labs.com>
//   Jonas Reitemeyer <alumni@bmc-labs.com>

//! Conversion between the metadata document of a session and its XML form.

use super::{xml::Element, Fubar, Metadata, Result, Vehicle, Venue, MAX_SECTORS};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;


/// Namespace of every OpenMotorsport document.
pub const NAMESPACE: &str = "http://66laps.org/ns/openmotorsport-1.0";
/// Name of the metadata entry inside a package.
pub const META_ENTRY: &str = "meta.xml";

const ROOT: &str = "openmotorsport";
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";


/// Everything a session stores in its metadata document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
  pub metadata:           Metadata,
  /// channel headers in document order
  pub channels:           Vec<ChannelHeader>,
  pub group_descriptions: BTreeMap<String, String>,
  pub markers:            Vec<f64>,
  pub num_sectors:        Option<usize>,
}


/// A channel as described by the metadata document, i.e. without samples.
/// Channels without `interval` are sampled at variable rate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelHeader {
  pub id:          u32,
  pub name:        String,
  pub group:       Option<String>,
  pub interval:    Option<u32>,
  pub units:       Option<String>,
  pub description: Option<String>,
}


// ENCODING -------------------------------------------------------------- //

/// Serializes a document. Fails if venue or vehicle name are missing.
pub fn encode(document: &Document) -> Result<Vec<u8>> {
  document.metadata.validate()?;

  let mut root = Element::new(ROOT).with_attribute("xmlns", NAMESPACE);
  root.push(encode_metadata(&document.metadata));
  root.push(encode_channels(&document.channels, &document.group_descriptions));
  root.push(encode_markers(&document.markers, document.num_sectors));
  root.to_bytes()
}

fn encode_metadata(metadata: &Metadata) -> Element {
  let mut element = Element::new("metadata");
  element.push(Element::new("user").with_text(metadata.user()
                                                      .as_deref()
                                                      .unwrap_or_default()));

  let mut venue = Element::new("venue");
  venue.push_text("name", metadata.venue().name().as_deref());
  venue.push_text("configuration",
                  metadata.venue().configuration().as_deref());
  element.push(venue);

  let vehicle = metadata.vehicle();
  let mut node = Element::new("vehicle");
  node.push_text("name", vehicle.name().as_deref());
  node.push_text("year", vehicle.year().as_deref());
  node.push_text("category", vehicle.category().as_deref());
  node.push_text("comments", vehicle.comments().as_deref());
  element.push(node);

  let date = metadata.date().format(DATE_FORMAT).to_string();
  element.push_text("date", Some(date.as_str()));
  element.push_text("comments", metadata.comments().as_deref());
  element.push_text("datasource", metadata.datasource().as_deref());
  element.push_text("duration",
                    metadata.duration()
                            .map(|duration| duration.to_string())
                            .as_deref());
  element
}

fn encode_channels(channels: &[ChannelHeader],
                   descriptions: &BTreeMap<String, String>)
                   -> Element {
  let mut element = Element::new("channels");
  let mut groups: HashMap<&str, usize> = HashMap::new();

  for channel in channels {
    let node = encode_channel(channel);
    let group = match &channel.group {
      Some(group) => group,
      None => {
        element.push(node);
        continue;
      }
    };

    match groups.get(group.as_str()) {
      Some(&index) => element.children[index].push(node),
      None => {
        let mut group_node = Element::new("group");
        group_node.push_text("name", Some(group.as_str()));
        group_node.push_text("description",
                             descriptions.get(group).map(String::as_str));
        group_node.push(node);
        groups.insert(group.as_str(), element.children.len());
        element.push(group_node);
      }
    }
  }
  element
}

fn encode_channel(channel: &ChannelHeader) -> Element {
  let mut element =
    Element::new("channel").with_attribute("id", &channel.id.to_string());
  if let Some(interval) = channel.interval {
    element = element.with_attribute("interval", &interval.to_string());
  }
  if let Some(units) = &channel.units {
    element = element.with_attribute("units", units);
  }
  element.push_text("name", Some(channel.name.as_str()));
  element.push_text("description", channel.description.as_deref());
  element
}

fn encode_markers(markers: &[f64], num_sectors: Option<usize>) -> Element {
  let mut element = Element::new("markers");
  if let Some(num_sectors) = num_sectors {
    element = element.with_attribute("sectors", &num_sectors.to_string());
  }
  for marker in markers {
    element.push(Element::new("marker").with_attribute("time",
                                                       &format!("{:.2}",
                                                                marker)));
  }
  element
}


// DECODING -------------------------------------------------------------- //

/// Parses a document. Only structure is checked here, a decoded document may
/// well lack the fields mandatory for writing it again.
pub fn decode(bytes: &[u8]) -> Result<Document> {
  let root = Element::parse(bytes)?;
  ensure!(root.name == ROOT,
          Fubar::Codec(format!("unexpected root element '{}'", root.name)));
  match root.attribute("xmlns") {
    Some(namespace) if namespace == NAMESPACE => {}
    namespace => warn!(?namespace, "unexpected document namespace"),
  }

  let metadata = decode_metadata(required(&root, "metadata")?)?;

  let mut channels = Vec::new();
  let mut group_descriptions = BTreeMap::new();
  if let Some(element) = root.child("channels") {
    for node in &element.children {
      match node.name.as_str() {
        "channel" => channels.push(decode_channel(node, None)?),
        "group" => {
          let group = required_text(node, "name")?;
          if let Some(description) = node.child_text("description") {
            group_descriptions.insert(group.to_string(),
                                      description.to_string());
          }
          for channel in node.children_named("channel") {
            channels.push(decode_channel(channel, Some(group))?);
          }
        }
        other => warn!(element = other, "skipping unknown channels element"),
      }
    }
  }

  let (markers, num_sectors) = match root.child("markers") {
    Some(element) => decode_markers(element)?,
    None => (Vec::new(), None),
  };

  Ok(Document { metadata,
                channels,
                group_descriptions,
                markers,
                num_sectors })
}

fn decode_metadata(element: &Element) -> Result<Metadata> {
  let text = |parent: Option<&Element>, name: &str| {
    parent.and_then(|p| p.child_text(name)).map(String::from)
  };

  let venue_node = element.child("venue");
  let mut venue = Venue::default();
  venue.set_name(text(venue_node, "name"))
       .set_configuration(text(venue_node, "configuration"));

  let vehicle_node = element.child("vehicle");
  let mut vehicle = Vehicle::default();
  vehicle.set_name(text(vehicle_node, "name"))
         .set_year(text(vehicle_node, "year"))
         .set_category(text(vehicle_node, "category"))
         .set_comments(text(vehicle_node, "comments"));

  let date =
    NaiveDateTime::parse_from_str(required_text(element, "date")?, DATE_FORMAT)?;

  let mut metadata = Metadata::new(venue, vehicle, date);
  *metadata.user_mut() = text(Some(element), "user");
  *metadata.comments_mut() = text(Some(element), "comments");
  *metadata.datasource_mut() = text(Some(element), "datasource");
  metadata.set_duration(element.child_text("duration")
                               .map(str::parse::<f64>)
                               .transpose()?);
  Ok(metadata)
}

fn decode_channel(element: &Element, group: Option<&str>) -> Result<ChannelHeader> {
  let id = element.attribute("id")
                  .ok_or_else(|| Fubar::Codec("channel without id".to_string()))?
                  .parse::<u32>()?;

  Ok(ChannelHeader { id,
                     name: required_text(element, "name")?.to_string(),
                     group: group.map(String::from),
                     interval: element.attribute("interval")
                                      .map(str::parse::<u32>)
                                      .transpose()?,
                     units: element.attribute("units").map(String::from),
                     description: element.child_text("description")
                                         .map(String::from) })
}

fn decode_markers(element: &Element) -> Result<(Vec<f64>, Option<usize>)> {
  let num_sectors = element.attribute("sectors")
                           .map(str::parse::<usize>)
                           .transpose()?;
  if let Some(num_sectors) = num_sectors {
    ensure!(num_sectors <= MAX_SECTORS,
            Fubar::Codec(format!("{} sectors per lap exceed {}",
                                 num_sectors, MAX_SECTORS)));
  }
  let markers = element.children_named("marker")
                       .map(|marker| {
                         marker.attribute("time")
                               .ok_or_else(|| {
                                 Fubar::Codec("marker without time".to_string())
                               })?
                               .parse::<f64>()
                               .map_err(Fubar::from)
                       })
                       .collect::<Result<Vec<_>>>()?;
  Ok((markers, num_sectors))
}

fn required<'a>(element: &'a Element, name: &str) -> Result<&'a Element> {
  element.child(name).ok_or_else(|| {
                       Fubar::Codec(format!("<{}> lacks <{}>", element.name, name))
                     })
}

fn required_text<'a>(element: &'a Element, name: &str) -> Result<&'a str> {
  element.child_text(name).ok_or_else(|| {
                            Fubar::Codec(format!("<{}> lacks <{}>",
                                                 element.name, name))
                          })
}


#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;
  use pretty_assertions::assert_eq;


  fn document() -> Document {
    let date = NaiveDate::from_ymd_opt(2010, 7, 11).unwrap()
                                                   .and_hms_opt(14, 0, 0)
                                                   .unwrap();
    let metadata =
      Metadata::new(Venue::new("Silverstone").with_configuration("Arena GP"),
                    Vehicle::new("Mercedes MGP W01").with_year("2010")
                                                    .with_category("Formula One"),
                    date).with_user("Michael Schumacher");

    let header = |id, name: &str, group: Option<&str>, interval| {
      ChannelHeader { id,
                      name: name.to_string(),
                      group: group.map(String::from),
                      interval,
                      units: None,
                      description: None }
    };

    let mut speed = header(0, "Speed", None, Some(1));
    speed.units = Some("km/h".to_string());
    speed.description = Some("ground speed".to_string());

    let mut group_descriptions = BTreeMap::new();
    group_descriptions.insert("Position".to_string(),
                              "GPS derived".to_string());

    Document { metadata,
               channels: vec![speed,
                              header(1, "Latitude", Some("Position"), Some(100)),
                              header(2, "Gear", None, None),
                              header(3, "Longitude", Some("Position"), Some(100)),],
               group_descriptions,
               markers: vec![10.0, 20.5, 30.126],
               num_sectors: Some(2) }
  }

  #[test]
  fn encode_test() {
    let xml = String::from_utf8(encode(&document()).unwrap()).unwrap();
    assert!(xml.contains(r#"<openmotorsport xmlns="http://66laps.org/ns/openmotorsport-1.0">"#));
    assert!(xml.contains("<date>2010-07-11T14:00:00</date>"));
    assert!(xml.contains(r#"<channel id="0" interval="1" units="km/h">"#));
    assert!(xml.contains(r#"<channel id="2">"#));
    assert!(xml.contains(r#"<markers sectors="2">"#));
    assert!(xml.contains(r#"<marker time="20.50"/>"#));
    assert!(xml.contains(r#"<marker time="30.13"/>"#));
    assert!(!xml.contains("<duration>"));
    assert_eq!(1, xml.matches("<group>").count());
  }

  #[test]
  fn roundtrip_test() {
    let mut expected = document();
    let decoded = decode(&encode(&expected).unwrap()).unwrap();

    // grouped channels come back in group order, markers at two decimals
    expected.channels.swap(2, 3);
    expected.markers[2] = decoded.markers[2];
    assert_eq!(expected, decoded);
  }

  #[test]
  fn missing_mandatory_test() {
    let mut document = document();
    document.metadata.venue_mut().set_name(None);
    assert_eq!(Err(Fubar::MissingMandatoryMetadata("venue name")),
               encode(&document));

    let mut document = self::document();
    document.metadata.vehicle_mut().set_name(None);
    assert_eq!(Err(Fubar::MissingMandatoryMetadata("vehicle name")),
               encode(&document));
  }

  #[test]
  fn decode_test() {
    let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
      <openmotorsport xmlns="http://66laps.org/ns/openmotorsport-1.0">
        <metadata>
          <user>Michael Schumacher</user>
          <venue><name>Silverstone</name></venue>
          <vehicle><name>Mercedes MGP W01</name></vehicle>
          <date>2010-07-11T14:00:00</date>
          <duration>12000</duration>
        </metadata>
        <channels>
          <group>
            <name>Engine</name>
            <channel id="4" interval="10"><name>RPM</name></channel>
          </group>
        </channels>
        <markers>
          <marker time="100"/>
          <marker time="200.00"/>
        </markers>
      </openmotorsport>"#;

    let document = decode(xml).unwrap();
    assert_eq!(&Some("Silverstone".to_string()),
               document.metadata.venue().name());
    assert_eq!(&None, document.metadata.venue().configuration());
    assert_eq!(Some(12_000.0), document.metadata.duration());
    assert_eq!(None, document.num_sectors);
    assert_eq!(vec![100.0, 200.0], document.markers);
    assert_eq!(1, document.channels.len());
    assert_eq!(Some("Engine".to_string()), document.channels[0].group);
    assert_eq!(Some(10), document.channels[0].interval);
    assert!(document.group_descriptions.is_empty());
  }

  #[test]
  fn decode_malformed_test() {
    assert!(matches!(decode(b"<warbl/>"), Err(Fubar::Codec(_))));
    assert!(matches!(decode(b"<openmotorsport/>"), Err(Fubar::Codec(_))));

    let xml = br#"<openmotorsport>
        <metadata><date>2010-07-11</date></metadata>
      </openmotorsport>"#;
    assert!(matches!(decode(xml), Err(Fubar::Codec(_))));

    let xml = br#"<openmotorsport>
        <metadata><date>2010-07-11T14:00:00</date></metadata>
        <channels><channel id="x"><name>Speed</name></channel></channels>
      </openmotorsport>"#;
    assert!(matches!(decode(xml), Err(Fubar::Codec(_))));
  }

  #[test]
  fn decode_sectors_test() {
    let xml = |sectors: &str| {
      format!(r#"<openmotorsport>
            <metadata><date>2010-07-11T14:00:00</date></metadata>
            <markers sectors="{}"><marker time="10.00"/></markers>
          </openmotorsport>"#,
              sectors)
    };

    for sectors in &["18446744073709551615", "4000000000", "65536"] {
      assert!(matches!(decode(xml(sectors).as_bytes()), Err(Fubar::Codec(_))));
    }
    assert!(matches!(decode(xml("-1").as_bytes()), Err(Fubar::Codec(_))));

    let document = decode(xml("65535").as_bytes()).unwrap();
    assert_eq!(Some(MAX_SECTORS), document.num_sectors);
    assert_eq!(vec![10.0], document.markers);
  }
}
