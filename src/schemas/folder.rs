//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Propbag.
//
// Propbag is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Propbag is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Propbag. If not, see <http://www.gnu.org/licenses/>.

//! The folder schema.

use lazy_static::lazy_static;

use crate::property::complex::ComplexSchema;
use crate::property::descriptor::{PropertyDescriptor, PropertyFlags};
use crate::property::primitive::Primitive;
use crate::property::schema::{Schema, UpdateTarget};
use crate::property::version::ExchangeVersion;

pub static DISTINGUISHED_USER_NAMES: &[&str] = &["Default", "Anonymous"];
pub static PERMISSION_LEVEL_NAMES: &[&str] = &[
    "None",
    "Owner",
    "PublishingEditor",
    "Editor",
    "PublishingAuthor",
    "Author",
    "NoneditingAuthor",
    "Reviewer",
    "Contributor",
    "Custom",
];
pub static READ_ACCESS_NAMES: &[&str] = &["None", "FullDetails"];

lazy_static! {
    pub static ref FOLDER_ID_SCHEMA: ComplexSchema =
        ComplexSchema::new("FolderId")
            .attribute("Id", Primitive::Text)
            .attribute("ChangeKey", Primitive::Text);

    pub static ref EFFECTIVE_RIGHTS_SCHEMA: ComplexSchema =
        ComplexSchema::new("EffectiveRights")
            .element("CreateAssociated", Primitive::Boolean)
            .element("CreateContents", Primitive::Boolean)
            .element("CreateHierarchy", Primitive::Boolean)
            .element("Delete", Primitive::Boolean)
            .element("Modify", Primitive::Boolean)
            .element("Read", Primitive::Boolean);

    pub static ref USER_ID_SCHEMA: ComplexSchema = ComplexSchema::new("UserId")
        .element("PrimarySmtpAddress", Primitive::Text)
        .element(
            "DistinguishedUser",
            Primitive::Enumeration(DISTINGUISHED_USER_NAMES),
        )
        .element("DisplayName", Primitive::Text);

    pub static ref PERMISSION_SCHEMA: ComplexSchema =
        ComplexSchema::new("Permission")
            .nested("UserId", &USER_ID_SCHEMA)
            .element("CanCreateItems", Primitive::Boolean)
            .element("CanCreateSubFolders", Primitive::Boolean)
            .element("IsFolderOwner", Primitive::Boolean)
            .element("IsFolderVisible", Primitive::Boolean)
            .element("IsFolderContact", Primitive::Boolean)
            .element("ReadItems", Primitive::Enumeration(READ_ACCESS_NAMES))
            .element(
                "PermissionLevel",
                Primitive::Enumeration(PERMISSION_LEVEL_NAMES),
            );

    /// A retention policy tag: a GUID, and whether it was applied to the
    /// folder directly.
    pub static ref RETENTION_TAG_SCHEMA: ComplexSchema =
        ComplexSchema::new("RetentionTag")
            .attribute("IsExplicit", Primitive::Boolean)
            .text("Value", Primitive::Text);

    pub static ref FOLDER_ID: PropertyDescriptor = PropertyDescriptor::complex(
        "FolderId",
        "folder:FolderId",
        &FOLDER_ID_SCHEMA,
    );

    pub static ref PARENT_FOLDER_ID: PropertyDescriptor =
        PropertyDescriptor::complex(
            "ParentFolderId",
            "folder:ParentFolderId",
            &FOLDER_ID_SCHEMA,
        );

    pub static ref FOLDER_CLASS: PropertyDescriptor =
        PropertyDescriptor::primitive(
            "FolderClass",
            "folder:FolderClass",
            Primitive::Text,
        )
        .with_flags(PropertyFlags::SETTABLE | PropertyFlags::UPDATABLE);

    pub static ref DISPLAY_NAME: PropertyDescriptor =
        PropertyDescriptor::primitive(
            "DisplayName",
            "folder:DisplayName",
            Primitive::Text,
        )
        .with_flags(PropertyFlags::MUTABLE);

    pub static ref TOTAL_COUNT: PropertyDescriptor =
        PropertyDescriptor::primitive(
            "TotalCount",
            "folder:TotalCount",
            Primitive::Integer,
        )
        .non_nullable();

    pub static ref CHILD_FOLDER_COUNT: PropertyDescriptor =
        PropertyDescriptor::primitive(
            "ChildFolderCount",
            "folder:ChildFolderCount",
            Primitive::Integer,
        )
        .non_nullable();

    pub static ref EFFECTIVE_RIGHTS: PropertyDescriptor =
        PropertyDescriptor::complex(
            "EffectiveRights",
            "folder:EffectiveRights",
            &EFFECTIVE_RIGHTS_SCHEMA,
        );

    pub static ref POLICY_TAG: PropertyDescriptor =
        PropertyDescriptor::complex(
            "PolicyTag",
            "folder:PolicyTag",
            &RETENTION_TAG_SCHEMA,
        )
        .with_flags(PropertyFlags::MUTABLE)
        .since(ExchangeVersion::Exchange2013);

    pub static ref PERMISSION_SET: PropertyDescriptor =
        PropertyDescriptor::collection(
            "PermissionSet",
            "folder:PermissionSet",
            &PERMISSION_SCHEMA,
            "Permission",
        )
        .contained("Permissions")
        .with_flags(
            PropertyFlags::SETTABLE
                | PropertyFlags::UPDATABLE
                | PropertyFlags::REQUIRES_EXPLICIT_LOAD,
        )
        .auto_create();

    pub static ref UNREAD_COUNT: PropertyDescriptor =
        PropertyDescriptor::primitive(
            "UnreadCount",
            "folder:UnreadCount",
            Primitive::Integer,
        )
        .non_nullable();

    pub static ref SCHEMA: Schema =
        Schema::builder("Folder", UpdateTarget::Folder)
            .id(&FOLDER_ID)
            .summary(&PARENT_FOLDER_ID)
            .summary(&FOLDER_CLASS)
            .summary(&DISPLAY_NAME)
            .summary(&TOTAL_COUNT)
            .summary(&CHILD_FOLDER_COUNT)
            .first_class(&EFFECTIVE_RIGHTS)
            .first_class(&POLICY_TAG)
            .field(&PERMISSION_SET)
            .first_class(&UNREAD_COUNT)
            .build();
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use chrono::FixedOffset;

    use super::*;
    use crate::property::bag::PropertyBag;
    use crate::property::complex::ComplexValue;
    use crate::property::schema::PropertySet;
    use crate::property::update::UpdateKind;
    use crate::property::value::Value;
    use crate::support::chronox::FixedOffsetX;
    use crate::support::error::Error;
    use crate::support::session_config::{Session, SessionConfig};
    use crate::xml::{XmlNamespace, XmlRead, XmlReader, XmlWriter};

    const GET_FOLDER_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<m:Folders xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages"
           xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
  <t:Folder>
    <t:FolderId Id="AQMkADAw" ChangeKey="AQAAABYA"/>
    <t:ParentFolderId Id="AQMkADAx" ChangeKey="AQAAAA=="/>
    <t:FolderClass>IPF.Note</t:FolderClass>
    <t:DisplayName>Inbox</t:DisplayName>
    <t:TotalCount>12</t:TotalCount>
    <t:ChildFolderCount>0</t:ChildFolderCount>
    <t:EffectiveRights>
      <t:CreateAssociated>true</t:CreateAssociated>
      <t:CreateContents>true</t:CreateContents>
      <t:CreateHierarchy>true</t:CreateHierarchy>
      <t:Delete>true</t:Delete>
      <t:Modify>true</t:Modify>
      <t:Read>true</t:Read>
    </t:EffectiveRights>
    <t:PolicyTag IsExplicit="true">e1a1d8f6-8a6c-4b36-ae9c-dc5b1c3d3f5a</t:PolicyTag>
    <t:PermissionSet>
      <t:Permissions>
        <t:Permission>
          <t:UserId><t:DistinguishedUser>Default</t:DistinguishedUser></t:UserId>
          <t:PermissionLevel>None</t:PermissionLevel>
        </t:Permission>
        <t:Permission>
          <t:UserId><t:PrimarySmtpAddress>ann@example.com</t:PrimarySmtpAddress></t:UserId>
          <t:CanCreateItems>true</t:CanCreateItems>
          <t:PermissionLevel>Editor</t:PermissionLevel>
        </t:Permission>
      </t:Permissions>
    </t:PermissionSet>
    <t:UnreadCount>3</t:UnreadCount>
  </t:Folder>
</m:Folders>"#;

    const ID_AND_NAME_RESPONSE: &str = r#"<m:Folders
    xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages"
    xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
  <t:Folder>
    <t:FolderId Id="AQMkADAw" ChangeKey="AQAAABYA"/>
    <t:DisplayName>Inbox</t:DisplayName>
  </t:Folder>
</m:Folders>"#;

    fn load_folder(
        xml: &str,
        session: Session,
        requested: &PropertySet,
    ) -> PropertyBag {
        crate::init_test_log();

        let mut reader = XmlReader::new(xml).unwrap();
        reader
            .read_start_element(XmlNamespace::Messages, "Folders")
            .unwrap();
        reader
            .read_start_element(XmlNamespace::Types, "Folder")
            .unwrap();

        let mut bag = PropertyBag::new(&SCHEMA, Arc::new(session));
        bag.load_from_xml(&mut reader, true, requested, false)
            .unwrap();
        reader
            .read_end_element(XmlNamespace::Messages, "Folders")
            .unwrap();
        bag
    }

    fn session(version: ExchangeVersion) -> Session {
        Session::new(version, FixedOffset::zero())
    }

    fn update_xml(bag: &PropertyBag) -> String {
        let mut writer = XmlWriter::new(Vec::new());
        bag.write_to_xml(&mut writer, true).unwrap();
        writer.into_string().unwrap()
    }

    #[test]
    fn load_id_and_name_then_rename() {
        let mut bag = load_folder(
            ID_AND_NAME_RESPONSE,
            session(ExchangeVersion::Exchange2013),
            &PropertySet::id_only().with(&DISPLAY_NAME),
        );

        assert_eq!(Some("Inbox"), bag.get_str(&DISPLAY_NAME).unwrap());
        let err = bag.get(&UNREAD_COUNT).unwrap_err();
        assert_matches!(Error::NotLoaded("UnreadCount"), &err);
        assert!(err.is_access_fault());

        bag.set(&DISPLAY_NAME, "Foo").unwrap();
        assert!(bag.needs_update_call());

        let ops = bag.build_update_payload();
        assert_eq!(1, ops.len());
        assert_eq!(UpdateKind::Set, ops[0].kind());
        assert!(std::ptr::eq(&*DISPLAY_NAME, ops[0].descriptor()));

        let xml = update_xml(&bag);
        assert!(
            xml.contains(
                "<t:SetFolderField>\
                 <t:FieldURI FieldURI=\"folder:DisplayName\"/>\
                 <t:Folder><t:DisplayName>Foo</t:DisplayName></t:Folder>\
                 </t:SetFolderField>"
            ),
            "{}",
            xml
        );

        bag.mark_saved();
        assert!(!bag.needs_update_call());
        assert!(bag.build_update_payload().is_empty());
    }

    #[test]
    fn load_full_folder() {
        let bag = load_folder(
            GET_FOLDER_RESPONSE,
            session(ExchangeVersion::Exchange2013),
            &PropertySet::first_class().with(&PERMISSION_SET),
        );

        assert_eq!(Some("IPF.Note"), bag.get_str(&FOLDER_CLASS).unwrap());
        assert_eq!(Some(12), bag.get_i64(&TOTAL_COUNT).unwrap());
        assert_eq!(Some(3), bag.get_i64(&UNREAD_COUNT).unwrap());
        assert_eq!(
            Some(&Value::Boolean(true)),
            bag.get_complex(&EFFECTIVE_RIGHTS)
                .unwrap()
                .unwrap()
                .get("Modify")
                .ok()
        );

        let tag = bag.get_complex(&POLICY_TAG).unwrap().unwrap();
        assert_eq!(Some(true), tag.get("IsExplicit").unwrap().as_bool());
        assert_eq!(
            Some("e1a1d8f6-8a6c-4b36-ae9c-dc5b1c3d3f5a"),
            tag.get_str("Value").unwrap()
        );

        let permissions = bag.get_collection(&PERMISSION_SET).unwrap().unwrap();
        assert_eq!(2, permissions.len());
        let ann = permissions.get(1).unwrap();
        assert_eq!(Some("Editor"), ann.get_str("PermissionLevel").unwrap());
        assert_eq!(
            Some("ann@example.com"),
            ann.get("UserId")
                .unwrap()
                .as_complex()
                .unwrap()
                .get_str("PrimarySmtpAddress")
                .unwrap()
        );
    }

    #[test]
    fn policy_tag_needs_2013() {
        let bag = load_folder(
            GET_FOLDER_RESPONSE,
            session(ExchangeVersion::Exchange2010Sp2),
            &PropertySet::first_class(),
        );

        assert!(!bag.is_loaded(&POLICY_TAG));
        assert_matches!(
            Err(Error::VersionIncompatible { .. }),
            bag.get(&POLICY_TAG)
        );
        // Not requested, but returned anyway
        assert!(bag.is_loaded(&PERMISSION_SET));
        assert_eq!(Some("Inbox"), bag.get_str(&DISPLAY_NAME).unwrap());
    }

    #[test]
    fn permission_changes_rewrite_whole_set() {
        let mut bag = load_folder(
            GET_FOLDER_RESPONSE,
            session(ExchangeVersion::Exchange2013),
            &PropertySet::id_only().with(&PERMISSION_SET),
        );

        let mut user = ComplexValue::new(&USER_ID_SCHEMA);
        user.set("PrimarySmtpAddress", "bob@example.com").unwrap();
        let bob = ComplexValue::new(&PERMISSION_SCHEMA)
            .with("UserId", user)
            .unwrap()
            .with("PermissionLevel", "Reviewer")
            .unwrap();
        bag.collection_mut(&PERMISSION_SET)
            .unwrap()
            .push(bob)
            .unwrap();

        let ops = bag.build_update_payload();
        assert_eq!(
            vec![UpdateKind::Set],
            ops.iter().map(|op| op.kind()).collect::<Vec<_>>()
        );

        let xml = update_xml(&bag);
        assert!(
            xml.contains(
                "<t:SetFolderField>\
                 <t:FieldURI FieldURI=\"folder:PermissionSet\"/>\
                 <t:Folder><t:PermissionSet><t:Permissions><t:Permission>"
            ),
            "{}",
            xml
        );
        assert_eq!(3, xml.matches("<t:Permission>").count());
        assert!(xml.contains(
            "<t:UserId><t:PrimarySmtpAddress>bob@example.com\
             </t:PrimarySmtpAddress></t:UserId>\
             <t:PermissionLevel>Reviewer</t:PermissionLevel>"
        ));
    }

    #[test]
    fn create_folder() {
        let config = SessionConfig::from_toml(
            "version = \"Exchange2010_SP1\"\ntime_zone = \"-08:00\"\n",
        )
        .unwrap();
        let session = Session::from_config(&config).unwrap();

        let mut bag = PropertyBag::new(&SCHEMA, Arc::new(session));
        bag.set(&DISPLAY_NAME, "Receipts").unwrap();
        bag.set(&FOLDER_CLASS, "IPF.Note").unwrap();
        assert_matches!(Err(Error::ReadOnly("TotalCount")), bag.set(&TOTAL_COUNT, 0));
        assert_matches!(
            Err(Error::VersionIncompatible { .. }),
            bag.set(&POLICY_TAG, ComplexValue::new(&RETENTION_TAG_SCHEMA))
        );

        let mut writer = XmlWriter::new(Vec::new());
        bag.write_to_xml(&mut writer, false).unwrap();
        let xml = writer.into_string().unwrap();
        let body = &xml[xml.find('>').unwrap() + 1..];
        assert_eq!(
            "<t:FolderClass>IPF.Note</t:FolderClass>\
             <t:DisplayName>Receipts</t:DisplayName></t:Folder>",
            body
        );
    }
}
