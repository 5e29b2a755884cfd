//! Well known MAPI property ids

/// Plain text message body
pub const BODY: u32 = 0x1000;
/// Compressed RTF message body
pub const RTF_COMPRESSED: u32 = 0x1009;
/// HTML message body
pub const BODY_HTML: u32 = 0x1013;
/// Display name
pub const DISPLAY_NAME: u32 = 0x3001;
/// Attachment content (binary or embedded object)
pub const ATTACH_DATA_OBJ: u32 = 0x3701;
/// Attachment 8.3 file name
pub const ATTACH_FILENAME: u32 = 0x3704;
/// Attachment long file name
pub const ATTACH_LONG_FILENAME: u32 = 0x3707;
/// Attachment MIME type
pub const ATTACH_MIME_TAG: u32 = 0x370e;
/// Attachment Content-ID
pub const ATTACH_CONTENT_ID: u32 = 0x3712;

/// Returns the canonical name of a property id, if known
pub fn get_tag_name(id: u32) -> Option<&'static str> {
    Some(match id {
        0x0002 => "PR_ALTERNATE_RECIPIENT_ALLOWED",
        0x0017 => "PR_IMPORTANCE",
        0x001a => "PR_MESSAGE_CLASS",
        0x0023 => "PR_ORIGINATOR_DELIVERY_REPORT_REQUESTED",
        0x0026 => "PR_PRIORITY",
        0x0029 => "PR_READ_RECEIPT_REQUESTED",
        0x0036 => "PR_SENSITIVITY",
        0x0037 => "PR_SUBJECT",
        0x0039 => "PR_CLIENT_SUBMIT_TIME",
        0x003b => "PR_SENT_REPRESENTING_SEARCH_KEY",
        0x0042 => "PR_SENT_REPRESENTING_NAME",
        0x0064 => "PR_SENT_REPRESENTING_ADDRTYPE",
        0x0065 => "PR_SENT_REPRESENTING_EMAIL_ADDRESS",
        0x0070 => "PR_CONVERSATION_TOPIC",
        0x0071 => "PR_CONVERSATION_INDEX",
        0x007d => "PR_TRANSPORT_MESSAGE_HEADERS",
        0x0c1a => "PR_SENDER_NAME",
        0x0c1e => "PR_SENDER_ADDRTYPE",
        0x0c1f => "PR_SENDER_EMAIL_ADDRESS",
        0x0e06 => "PR_MESSAGE_DELIVERY_TIME",
        0x0e07 => "PR_MESSAGE_FLAGS",
        0x0e08 => "PR_MESSAGE_SIZE",
        0x0e1f => "PR_RTF_IN_SYNC",
        0x0e20 => "PR_ATTACH_SIZE",
        0x0e21 => "PR_ATTACH_NUM",
        BODY => "PR_BODY",
        0x1006 => "PR_RTF_SYNC_BODY_CRC",
        0x1007 => "PR_RTF_SYNC_BODY_COUNT",
        0x1008 => "PR_RTF_SYNC_BODY_TAG",
        RTF_COMPRESSED => "PR_RTF_COMPRESSED",
        0x1010 => "PR_RTF_SYNC_PREFIX_COUNT",
        0x1011 => "PR_RTF_SYNC_TRAILING_COUNT",
        BODY_HTML => "PR_BODY_HTML",
        0x1035 => "PR_INTERNET_MESSAGE_ID",
        0x3001 => "PR_DISPLAY_NAME",
        0x3002 => "PR_ADDRTYPE",
        0x3003 => "PR_EMAIL_ADDRESS",
        0x3007 => "PR_CREATION_TIME",
        0x3008 => "PR_LAST_MODIFICATION_TIME",
        0x300b => "PR_SEARCH_KEY",
        0x3700 => "PR_ATTACHMENT_X400_PARAMETERS",
        ATTACH_DATA_OBJ => "PR_ATTACH_DATA_OBJ",
        0x3702 => "PR_ATTACH_ENCODING",
        0x3703 => "PR_ATTACH_EXTENSION",
        ATTACH_FILENAME => "PR_ATTACH_FILENAME",
        0x3705 => "PR_ATTACH_METHOD",
        ATTACH_LONG_FILENAME => "PR_ATTACH_LONG_FILENAME",
        0x3708 => "PR_ATTACH_PATHNAME",
        0x3709 => "PR_ATTACH_RENDERING",
        0x370a => "PR_ATTACH_TAG",
        0x370b => "PR_RENDERING_POSITION",
        0x370c => "PR_ATTACH_TRANSPORT_NAME",
        0x370d => "PR_ATTACH_LONG_PATHNAME",
        ATTACH_MIME_TAG => "PR_ATTACH_MIME_TAG",
        0x370f => "PR_ATTACH_ADDITIONAL_INFO",
        ATTACH_CONTENT_ID => "PR_ATTACH_CONTENT_ID",
        0x3713 => "PR_ATTACH_CONTENT_LOCATION",
        0x3714 => "PR_ATTACH_FLAGS",
        0x3fde => "PR_INTERNET_CPID",
        0x3ff1 => "PR_MESSAGE_LOCALE_ID",
        0x3ffd => "PR_MESSAGE_CODEPAGE",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(get_tag_name(RTF_COMPRESSED), Some("PR_RTF_COMPRESSED"));
        assert_eq!(get_tag_name(0x3707), Some("PR_ATTACH_LONG_FILENAME"));
        assert_eq!(get_tag_name(0xdead), None);
    }
}
