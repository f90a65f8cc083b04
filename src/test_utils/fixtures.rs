//! Sample declarations, fragments and templates for tests.

/// Model with an `Order` entity exercising keys, enums, version, logic delete,
/// transient members and a lazy association to `User`, plus a mapper without
/// an entity type.
pub const ORDER_MODEL: &str = r#"
[[enums]]
name = "OrderStatus"
code_type = "Integer"

[[entities]]
name = "User"
table = { name = "t_user" }
fields = [
    { name = "id", type = "Long" },
    { name = "name", type = "String" },
]

[[entities]]
name = "Order"
table = { name = "t_order", key = { name = "id" } }
fields = [
    { name = "id", type = "Long" },
    { name = "userId", type = "Long" },
    { name = "amount", type = "BigDecimal" },
    { name = "status", type = "OrderStatus" },
    { name = "gmtCreate", type = "Date" },
    { name = "gmtModified", type = "Date" },
    { name = "version", type = "Integer", version = true },
    { name = "deleted", type = "Integer", logic_delete = {} },
    { name = "remark", type = "String", transient = true },
    { name = "user", type = "User", lazy_column = "user_id" },
]

[[mappers]]
namespace = "demo.OrderMapper"
entity = "Order"

[[mappers]]
namespace = "demo.UserMapper"
entity = "User"

[[mappers]]
namespace = "demo.ReportMapper"
"#;

/// A compact template generating the basic CRUD statements.
pub const CRUD_TEMPLATE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<mapper namespace="{{ context.namespace }}">
    <resultMap id="baseResultMap" type="{{ context.entity_name }}">
{%- for c in columns %}
        <{% if c.is_pk %}id{% else %}result{% endif %} column="{{ c.column }}" property="{{ c.member }}"/>
{%- endfor %}
    </resultMap>
    <select id="select" resultMap="baseResultMap">SELECT * FROM {{ table.name }} WHERE {{ key.column }} = {{ key.param }}</select>
    <insert id="insert">INSERT INTO {{ table.name }} ({% for c in insert_columns %}{{ c.column }}{% if not loop.last %}, {% endif %}{% endfor %}) VALUES ({% for c in insert_columns %}{{ c.insert_value }}{% if not loop.last %}, {% endif %}{% endfor %})</insert>
    <update id="update">UPDATE {{ table.name }} SET {% for c in update_columns %}{{ c.column }} = {{ c.update_value }}{% if not loop.last %}, {% endif %}{% endfor %} WHERE {{ key.column }} = {{ key.param }}</update>
    <delete id="delete">DELETE FROM {{ table.name }} WHERE {{ key.column }} = {{ key.param }}</delete>
    <!--_ext_mapper_-->
</mapper>
"#;

/// A hand-written fragment for `namespace` holding one select statement.
pub fn mapper_fragment(namespace: &str, statement: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE mapper PUBLIC "-//mybatis.org//DTD Mapper 3.0//EN" "http://mybatis.org/dtd/mybatis-3-mapper.dtd">
<mapper namespace="{namespace}">
    <select id="{statement}" resultMap="baseResultMap">
        SELECT * FROM t_order ORDER BY amount DESC LIMIT #{{limit}}
    </select>
</mapper>
"#
    )
}

/// The `OrderMapper.xml` fragment.
pub fn order_fragment(statement: &str) -> String {
    mapper_fragment("demo.OrderMapper", statement)
}
