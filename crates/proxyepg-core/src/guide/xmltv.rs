//! XMLTV serialization of a [`Guide`].

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::{Guide, GuideChannel};
use crate::programme::Programme;
use crate::timestamp::format_xmltv;

/// Errors raised while writing a guide.
#[derive(Debug, thiserror::Error)]
pub enum XmltvError {
    #[error("failed to write XMLTV: {0}")]
    Io(#[from] std::io::Error),
    #[error("XMLTV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Guide {
    /// Renders the guide as an XMLTV document with a trailing newline.
    pub fn to_xmltv(&self) -> Result<String, XmltvError> {
        let mut buf = Vec::new();
        self.write_xmltv(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    /// Streams the guide as XMLTV into `out`.
    pub fn write_xmltv<W: Write>(&self, out: W) -> Result<(), XmltvError> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        let lang = self.meta.lang.as_str();

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut tv = BytesStart::new("tv");
        tv.push_attribute(("source-info-name", self.meta.source_info_name.as_str()));
        tv.push_attribute(("generator-info-name", self.meta.generator_info_name.as_str()));
        writer.write_event(Event::Start(tv))?;

        for channel in &self.channels {
            write_channel(&mut writer, channel, lang)?;
        }
        for programme in &self.programmes {
            write_programme(&mut writer, programme, lang)?;
        }

        writer.write_event(Event::End(BytesEnd::new("tv")))?;
        writer.get_mut().write_all(b"\n")?;
        Ok(())
    }
}

fn write_channel<W: Write>(
    writer: &mut Writer<W>,
    channel: &GuideChannel,
    lang: &str,
) -> std::io::Result<()> {
    let mut start = BytesStart::new("channel");
    start.push_attribute(("id", channel.id.as_str()));
    writer.write_event(Event::Start(start))?;
    write_text_element(writer, "display-name", &channel.display_name, lang)?;
    writer.write_event(Event::End(BytesEnd::new("channel")))
}

fn write_programme<W: Write>(
    writer: &mut Writer<W>,
    programme: &Programme,
    lang: &str,
) -> std::io::Result<()> {
    let mut start = BytesStart::new("programme");
    start.push_attribute(("start", format_xmltv(programme.start).as_str()));
    start.push_attribute(("stop", format_xmltv(programme.end).as_str()));
    start.push_attribute(("channel", programme.channel_id.as_str()));
    writer.write_event(Event::Start(start))?;
    write_text_element(writer, "title", &programme.title, lang)?;
    if let Some(desc) = &programme.description {
        write_text_element(writer, "desc", desc, lang)?;
    }
    writer.write_event(Event::End(BytesEnd::new("programme")))
}

fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
    lang: &str,
) -> std::io::Result<()> {
    let mut start = BytesStart::new(name);
    start.push_attribute(("lang", lang));
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))
}
